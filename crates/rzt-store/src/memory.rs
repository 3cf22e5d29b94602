use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rzt_types::{
    Color, ColorLink, EntityKind, Pattern, PatternLink, Settings, Tissue, TissueView,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::CatalogStore;

/// Everything a catalog holds, in creation order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    #[serde(default)]
    pub tissues: Vec<Tissue>,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub links: Vec<ColorLink>,
    #[serde(default)]
    pub pattern_links: Vec<PatternLink>,
    #[serde(default)]
    pub settings: Settings,
}

/// Records that can live in a [`CatalogState`] collection.
trait Record: Clone {
    const KIND: EntityKind;
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

macro_rules! impl_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: EntityKind = $kind;
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

impl_record!(Tissue, EntityKind::Tissues);
impl_record!(Color, EntityKind::Colors);
impl_record!(Pattern, EntityKind::Patterns);
impl_record!(ColorLink, EntityKind::Links);
impl_record!(PatternLink, EntityKind::PatternLinks);

fn insert_into<R: Record>(records: &mut Vec<R>, mut record: R) -> StoreResult<R> {
    if record.id().is_empty() {
        record.set_id(Uuid::now_v7().to_string());
    } else if records.iter().any(|r| r.id() == record.id()) {
        return Err(StoreError::Duplicate {
            kind: R::KIND,
            id: record.id().to_string(),
        });
    }
    records.push(record.clone());
    Ok(record)
}

fn update_in<R: Record>(records: &mut [R], record: &R) -> StoreResult<()> {
    let slot = records
        .iter_mut()
        .find(|r| r.id() == record.id())
        .ok_or_else(|| StoreError::NotFound {
            kind: R::KIND,
            id: record.id().to_string(),
        })?;
    *slot = record.clone();
    Ok(())
}

fn tissue_view(tissue: &Tissue) -> TissueView {
    TissueView {
        tissue_sku: Some(tissue.sku.clone()),
        tissue_name: Some(tissue.name.clone()),
        width: Some(tissue.width),
        composition: Some(tissue.composition.clone()),
    }
}

impl CatalogState {
    /// Link rows joined with the current tissue and color rows.
    pub fn link_views(&self) -> Vec<ColorLink> {
        self.links
            .iter()
            .map(|link| {
                let mut view = link.clone();
                let tissue = self.tissues.iter().find(|t| t.id == link.tissue_id);
                let color = self.colors.iter().find(|c| c.id == link.color_id);
                if let Some(tissue) = tissue {
                    view.tissue = tissue_view(tissue);
                }
                if let Some(color) = color {
                    view.color_sku = Some(color.sku.clone());
                    view.color_name = Some(color.name.clone());
                    view.hex = color.hex.clone();
                }
                if let (Some(tissue), Some(color)) = (tissue, color) {
                    view.full_name = Some(format!("{} {}", tissue.name, color.name));
                }
                view
            })
            .collect()
    }

    /// Pattern-link rows joined with the current tissue and pattern rows.
    pub fn pattern_link_views(&self) -> Vec<PatternLink> {
        self.pattern_links
            .iter()
            .map(|link| {
                let mut view = link.clone();
                let tissue = self.tissues.iter().find(|t| t.id == link.tissue_id);
                let pattern = self.patterns.iter().find(|p| p.id == link.pattern_id);
                if let Some(tissue) = tissue {
                    view.tissue = tissue_view(tissue);
                }
                if let Some(pattern) = pattern {
                    view.pattern_sku = Some(pattern.sku.clone());
                    view.pattern_family = Some(pattern.family.clone());
                    view.pattern_name = Some(pattern.name.clone());
                }
                if let (Some(tissue), Some(pattern)) = (tissue, pattern) {
                    view.full_name = Some(format!(
                        "{} {} {}",
                        tissue.name, pattern.family, pattern.name
                    ));
                }
                view
            })
            .collect()
    }
}

/// In-memory catalog store.
///
/// Intended for tests and embedding. State lives behind a `RwLock`; records
/// are cloned on read and write.
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::from_state(CatalogState::default())
    }

    pub fn from_state(state: CatalogState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// A copy of the full state.
    pub fn snapshot(&self) -> StoreResult<CatalogState> {
        self.read(|state| Ok(state.clone()))
    }

    /// Replace the full state.
    pub fn restore(&self, state: CatalogState) -> StoreResult<()> {
        self.write(|current| {
            *current = state;
            Ok(())
        })
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogState) -> StoreResult<T>) -> StoreResult<T> {
        let state = self
            .state
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut CatalogState) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self
            .state
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        f(&mut state)
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn list_tissues(&self) -> StoreResult<Vec<Tissue>> {
        self.read(|s| Ok(s.tissues.clone()))
    }

    fn list_colors(&self) -> StoreResult<Vec<Color>> {
        self.read(|s| Ok(s.colors.clone()))
    }

    fn list_patterns(&self) -> StoreResult<Vec<Pattern>> {
        self.read(|s| Ok(s.patterns.clone()))
    }

    fn list_links(&self) -> StoreResult<Vec<ColorLink>> {
        self.read(|s| Ok(s.link_views()))
    }

    fn list_pattern_links(&self) -> StoreResult<Vec<PatternLink>> {
        self.read(|s| Ok(s.pattern_link_views()))
    }

    fn insert_tissue(&self, tissue: Tissue) -> StoreResult<Tissue> {
        self.write(|s| insert_into(&mut s.tissues, tissue))
    }

    fn insert_color(&self, color: Color) -> StoreResult<Color> {
        self.write(|s| insert_into(&mut s.colors, color))
    }

    fn insert_pattern(&self, pattern: Pattern) -> StoreResult<Pattern> {
        self.write(|s| insert_into(&mut s.patterns, pattern))
    }

    fn insert_link(&self, link: ColorLink) -> StoreResult<ColorLink> {
        self.write(|s| insert_into(&mut s.links, link))
    }

    fn insert_pattern_link(&self, link: PatternLink) -> StoreResult<PatternLink> {
        self.write(|s| insert_into(&mut s.pattern_links, link))
    }

    fn update_tissue(&self, tissue: &Tissue) -> StoreResult<()> {
        self.write(|s| update_in(&mut s.tissues, tissue))
    }

    fn update_color(&self, color: &Color) -> StoreResult<()> {
        self.write(|s| update_in(&mut s.colors, color))
    }

    fn update_pattern(&self, pattern: &Pattern) -> StoreResult<()> {
        self.write(|s| update_in(&mut s.patterns, pattern))
    }

    fn update_link(&self, link: &ColorLink) -> StoreResult<()> {
        self.write(|s| update_in(&mut s.links, link))
    }

    fn update_pattern_link(&self, link: &PatternLink) -> StoreResult<()> {
        self.write(|s| update_in(&mut s.pattern_links, link))
    }

    fn read_settings(&self) -> StoreResult<Settings> {
        self.read(|s| Ok(s.settings.clone()))
    }

    fn write_settings(&self, settings: &Settings) -> StoreResult<()> {
        self.write(|s| {
            s.settings = settings.clone();
            Ok(())
        })
    }
}

impl std::fmt::Debug for InMemoryCatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts = self.read(|s| {
            Ok((s.tissues.len(), s.colors.len(), s.patterns.len(), s.links.len()))
        });
        f.debug_struct("InMemoryCatalogStore")
            .field("counts", &counts.ok())
            .finish()
    }
}
