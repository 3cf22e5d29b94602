use rzt_types::{Color, ColorLink, Pattern, PatternLink, Settings, Tissue};

use crate::error::StoreResult;
use crate::image::{ImageBlob, StoredImage};

/// The catalog datastore consumed by export and import.
///
/// Implementations must uphold:
/// - Listings return records in a stable order (creation order), so that
///   repeated exports of an unchanged catalog hash identically.
/// - Link listings are denormalized views: joined display fields reflect the
///   current tissue/color/pattern rows.
/// - `insert_*` assigns a fresh id when the incoming record has none and
///   rejects an id that is already taken.
/// - `update_*` matches by id and replaces the stored record.
/// - A write that returns an error leaves no trace.
/// - Outside a batch each call stands alone.
pub trait CatalogStore: Send + Sync {
    fn list_tissues(&self) -> StoreResult<Vec<Tissue>>;
    fn list_colors(&self) -> StoreResult<Vec<Color>>;
    fn list_patterns(&self) -> StoreResult<Vec<Pattern>>;
    fn list_links(&self) -> StoreResult<Vec<ColorLink>>;
    fn list_pattern_links(&self) -> StoreResult<Vec<PatternLink>>;

    fn insert_tissue(&self, tissue: Tissue) -> StoreResult<Tissue>;
    fn insert_color(&self, color: Color) -> StoreResult<Color>;
    fn insert_pattern(&self, pattern: Pattern) -> StoreResult<Pattern>;
    fn insert_link(&self, link: ColorLink) -> StoreResult<ColorLink>;
    fn insert_pattern_link(&self, link: PatternLink) -> StoreResult<PatternLink>;

    fn update_tissue(&self, tissue: &Tissue) -> StoreResult<()>;
    fn update_color(&self, color: &Color) -> StoreResult<()>;
    fn update_pattern(&self, pattern: &Pattern) -> StoreResult<()>;
    fn update_link(&self, link: &ColorLink) -> StoreResult<()>;
    fn update_pattern_link(&self, link: &PatternLink) -> StoreResult<()>;

    /// Read persisted settings. Callers treat this as best-effort.
    fn read_settings(&self) -> StoreResult<Settings>;

    /// Persist settings. Callers treat this as best-effort.
    fn write_settings(&self, settings: &Settings) -> StoreResult<()>;

    /// Start grouping writes. A store that persists every write may defer
    /// persistence until [`finish_batch`](Self::finish_batch).
    fn begin_batch(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Persist the writes made since `begin_batch`. On error they are
    /// discarded, leaving the state that was last persisted.
    fn finish_batch(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Returns `true` when no tissues, colors, or patterns exist.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.list_tissues()?.is_empty()
            && self.list_colors()?.is_empty()
            && self.list_patterns()?.is_empty())
    }
}

/// Content-addressed storage for link images.
///
/// Writing the same bytes twice yields the same key and stores one blob.
pub trait ImageStore: Send + Sync {
    /// Store `bytes` and return the content address it was filed under.
    fn put(&self, mime: Option<&str>, bytes: &[u8]) -> StoreResult<StoredImage>;

    /// Fetch a blob by content key or storage path. `Ok(None)` when absent.
    fn get(&self, key: &str) -> StoreResult<Option<ImageBlob>>;

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
