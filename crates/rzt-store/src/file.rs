use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rzt_types::{Color, ColorLink, Pattern, PatternLink, Settings, Tissue};

use crate::error::{StoreError, StoreResult};
use crate::memory::{CatalogState, InMemoryCatalogStore};
use crate::traits::CatalogStore;

/// Catalog store persisted as a single JSON document.
///
/// Reads are served from memory. Outside a batch every successful write
/// rewrites the file atomically (temp file in the same directory, then
/// rename); inside one the file is rewritten once, by `finish_batch`. When
/// a rewrite fails the in-memory state is put back to what is on disk.
#[derive(Debug)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
    inner: InMemoryCatalogStore,
    /// State as last persisted while a batch is open. Holding the lock
    /// serializes writers.
    batch: Mutex<Option<CatalogState>>,
}

impl JsonFileCatalogStore {
    /// Open the catalog at `path`. A missing file is an empty catalog.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<CatalogState>(&bytes)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogState::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            path = %path.display(),
            tissues = state.tissues.len(),
            colors = state.colors.len(),
            patterns = state.patterns.len(),
            "opened catalog"
        );
        Ok(Self {
            path,
            inner: InMemoryCatalogStore::from_state(state),
            batch: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state to disk.
    pub fn flush(&self) -> StoreResult<()> {
        let state = self.inner.snapshot()?;
        let json = serde_json::to_vec_pretty(&state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn lock_batch(&self) -> StoreResult<MutexGuard<'_, Option<CatalogState>>> {
        self.batch.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Flush, or put `persisted` back when the flush fails.
    fn flush_or_restore(&self, persisted: CatalogState) -> StoreResult<()> {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "catalog write failed; reverting");
            self.inner.restore(persisted)?;
            return Err(e);
        }
        Ok(())
    }

    fn saved<T>(&self, write: impl FnOnce(&InMemoryCatalogStore) -> StoreResult<T>) -> StoreResult<T> {
        let batch = self.lock_batch()?;
        if batch.is_some() {
            return write(&self.inner);
        }
        let persisted = self.inner.snapshot()?;
        let value = write(&self.inner)?;
        self.flush_or_restore(persisted)?;
        Ok(value)
    }
}

impl CatalogStore for JsonFileCatalogStore {
    fn list_tissues(&self) -> StoreResult<Vec<Tissue>> {
        self.inner.list_tissues()
    }

    fn list_colors(&self) -> StoreResult<Vec<Color>> {
        self.inner.list_colors()
    }

    fn list_patterns(&self) -> StoreResult<Vec<Pattern>> {
        self.inner.list_patterns()
    }

    fn list_links(&self) -> StoreResult<Vec<ColorLink>> {
        self.inner.list_links()
    }

    fn list_pattern_links(&self) -> StoreResult<Vec<PatternLink>> {
        self.inner.list_pattern_links()
    }

    fn insert_tissue(&self, tissue: Tissue) -> StoreResult<Tissue> {
        self.saved(|inner| inner.insert_tissue(tissue))
    }

    fn insert_color(&self, color: Color) -> StoreResult<Color> {
        self.saved(|inner| inner.insert_color(color))
    }

    fn insert_pattern(&self, pattern: Pattern) -> StoreResult<Pattern> {
        self.saved(|inner| inner.insert_pattern(pattern))
    }

    fn insert_link(&self, link: ColorLink) -> StoreResult<ColorLink> {
        self.saved(|inner| inner.insert_link(link))
    }

    fn insert_pattern_link(&self, link: PatternLink) -> StoreResult<PatternLink> {
        self.saved(|inner| inner.insert_pattern_link(link))
    }

    fn update_tissue(&self, tissue: &Tissue) -> StoreResult<()> {
        self.saved(|inner| inner.update_tissue(tissue))
    }

    fn update_color(&self, color: &Color) -> StoreResult<()> {
        self.saved(|inner| inner.update_color(color))
    }

    fn update_pattern(&self, pattern: &Pattern) -> StoreResult<()> {
        self.saved(|inner| inner.update_pattern(pattern))
    }

    fn update_link(&self, link: &ColorLink) -> StoreResult<()> {
        self.saved(|inner| inner.update_link(link))
    }

    fn update_pattern_link(&self, link: &PatternLink) -> StoreResult<()> {
        self.saved(|inner| inner.update_pattern_link(link))
    }

    fn read_settings(&self) -> StoreResult<Settings> {
        self.inner.read_settings()
    }

    fn write_settings(&self, settings: &Settings) -> StoreResult<()> {
        self.saved(|inner| inner.write_settings(settings))
    }

    fn begin_batch(&self) -> StoreResult<()> {
        let mut batch = self.lock_batch()?;
        if batch.is_none() {
            *batch = Some(self.inner.snapshot()?);
        }
        Ok(())
    }

    fn finish_batch(&self) -> StoreResult<()> {
        let mut batch = self.lock_batch()?;
        match batch.take() {
            Some(persisted) => self.flush_or_restore(persisted),
            None => Ok(()),
        }
    }
}
