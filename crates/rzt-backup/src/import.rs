//! Exact import of a full export into a catalog store.
//!
//! Records are upserted by natural key in dependency order: tissues, colors
//! and patterns first, then both link kinds. Links are created only from the
//! payload's own link sections. A failing record becomes an issue and the
//! batch goes on; only unparsable text is fatal.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use rzt_store::{decode_data_url, CatalogStore, ImageStore, StoreResult};
use rzt_types::{
    Attachment, Color, ColorLink, EntityKind, KindCounts, LinkImage, Pattern, PatternLink,
    Settings, Tissue, TissueView, SCHEMA,
};

use crate::error::{BackupError, BackupResult};
use crate::issue::{ImportIssue, ImportResult};
use crate::migrate;

/// Per-item checks run right after deserialization.
trait Checked: DeserializeOwned {
    fn check(&self) -> Result<(), String>;
}

trait ImportRecord: Checked + Clone {
    const KIND: EntityKind;
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Human-facing code (SKU or child SKU) used in issue messages.
    fn code(&self) -> &str;
    /// Upsert key. For links it is built from already re-pointed parent ids.
    fn natural_key(&self) -> String;
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is empty"))
    } else {
        Ok(())
    }
}

impl Checked for Tissue {
    fn check(&self) -> Result<(), String> {
        require("sku", &self.sku)?;
        require("name", &self.name)?;
        if !self.width.is_finite() {
            return Err("width is not a number".into());
        }
        Ok(())
    }
}

impl Checked for Color {
    fn check(&self) -> Result<(), String> {
        require("sku", &self.sku)?;
        require("name", &self.name)
    }
}

impl Checked for Pattern {
    fn check(&self) -> Result<(), String> {
        require("sku", &self.sku)?;
        require("family", &self.family)?;
        require("name", &self.name)
    }
}

impl Checked for ColorLink {
    fn check(&self) -> Result<(), String> {
        require("skuFilho", &self.sku_filho)?;
        require("tissueId", &self.tissue_id)?;
        require("colorId", &self.color_id)
    }
}

impl Checked for PatternLink {
    fn check(&self) -> Result<(), String> {
        require("skuFilho", &self.sku_filho)?;
        require("tissueId", &self.tissue_id)?;
        require("patternId", &self.pattern_id)
    }
}

impl Checked for Attachment {
    fn check(&self) -> Result<(), String> {
        require("hash", &self.hash)
    }
}

macro_rules! sku_record {
    ($ty:ty, $kind:expr) => {
        impl ImportRecord for $ty {
            const KIND: EntityKind = $kind;
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
            fn code(&self) -> &str {
                &self.sku
            }
            fn natural_key(&self) -> String {
                self.sku.clone()
            }
        }
    };
}

sku_record!(Tissue, EntityKind::Tissues);
sku_record!(Color, EntityKind::Colors);
sku_record!(Pattern, EntityKind::Patterns);

macro_rules! link_record {
    ($ty:ty, $kind:expr, $parent:ident) => {
        impl ImportRecord for $ty {
            const KIND: EntityKind = $kind;
            fn id(&self) -> &str {
                &self.id
            }
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
            fn code(&self) -> &str {
                &self.sku_filho
            }
            fn natural_key(&self) -> String {
                format!("{}/{}/{}", self.tissue_id, self.$parent, self.sku_filho)
            }
        }
    };
}

link_record!(ColorLink, EntityKind::Links, color_id);
link_record!(PatternLink, EntityKind::PatternLinks, pattern_id);

/// Where payload ids ended up in the store.
#[derive(Debug, Default)]
struct IdMap {
    /// Payload id -> stored id, for records matched or inserted.
    remap: HashMap<String, String>,
    /// Ids present in the store after this kind was processed.
    known: HashSet<String>,
    /// Payload ids whose record was skipped; they must not resolve to anything.
    skipped: HashSet<String>,
}

impl IdMap {
    fn resolve(&self, id: &str) -> Option<String> {
        if let Some(stored) = self.remap.get(id) {
            return Some(stored.clone());
        }
        if self.skipped.contains(id) || !self.known.contains(id) {
            return None;
        }
        Some(id.to_string())
    }

    fn skip(&mut self, id: &str) {
        if !id.is_empty() {
            self.skipped.insert(id.to_string());
        }
    }
}

/// Deserialize and check every item of `section`. Bad items become issues.
fn parse_section<R: Checked>(
    root: &Map<String, Value>,
    section: &str,
    result: &mut ImportResult,
) -> Vec<(usize, R)> {
    let items = match root.get(section) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            result.push(ImportIssue::validation(format!(
                "{section} is not an array; section skipped"
            )));
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let checked = serde_json::from_value::<R>(item.clone())
            .map_err(|e| e.to_string())
            .and_then(|record| record.check().map(|()| record));
        match checked {
            Ok(record) => records.push((idx, record)),
            Err(reason) => {
                result.push(ImportIssue::validation(format!(
                    "{section}[{idx}]: {reason}; record skipped"
                )));
            }
        }
    }
    records
}

fn clear_color_view(mut link: ColorLink) -> ColorLink {
    link.tissue = TissueView::default();
    link.color_sku = None;
    link.color_name = None;
    link.family = None;
    link.hex = None;
    link.full_name = None;
    link
}

fn clear_pattern_view(mut link: PatternLink) -> PatternLink {
    link.tissue = TissueView::default();
    link.pattern_sku = None;
    link.pattern_family = None;
    link.pattern_name = None;
    link.full_name = None;
    link
}

/// Imports full exports into a [`CatalogStore`].
pub struct ImportEngine<'a> {
    store: &'a dyn CatalogStore,
    images: Option<&'a dyn ImageStore>,
}

impl<'a> ImportEngine<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self {
            store,
            images: None,
        }
    }

    /// Persist link images into `images` while importing.
    pub fn with_images(mut self, images: &'a dyn ImageStore) -> Self {
        self.images = Some(images);
        self
    }

    /// Import `raw` exactly.
    ///
    /// Fails only when `raw` is not a JSON object, in which case nothing is
    /// written. Every other problem is reported in [`ImportResult::issues`].
    pub fn import_exact(&self, raw: &str) -> BackupResult<ImportResult> {
        let root: Value =
            serde_json::from_str(raw).map_err(|e| BackupError::Parse(e.to_string()))?;
        let Value::Object(mut root) = root else {
            return Err(BackupError::Parse("payload root is not an object".into()));
        };

        let mut result = ImportResult::default();
        if root.get("schema").and_then(Value::as_str) != Some(SCHEMA) {
            result.push(ImportIssue::validation(
                "schema missing or unrecognized; importing recognized sections",
            ));
        }
        let (version, issues) = migrate::upgrade(&mut root);
        for issue in issues {
            result.push(issue);
        }

        let attachments = Self::attachment_table(&root, &mut result);

        if let Err(e) = self.store.begin_batch() {
            result.push(ImportIssue::store(format!(
                "could not group writes: {e}; each write persists on its own"
            )));
        }

        let mut tissue_ids = IdMap::default();
        let mut color_ids = IdMap::default();
        let mut pattern_ids = IdMap::default();
        for kind in EntityKind::DEPENDENCY_ORDER {
            let section = kind.as_str();
            match kind {
                EntityKind::Tissues => {
                    tissue_ids = self.upsert_kind(
                        parse_section::<Tissue>(&root, section, &mut result),
                        self.store.list_tissues(),
                        |t| self.store.insert_tissue(t),
                        |t| self.store.update_tissue(t),
                        &mut result,
                    );
                }
                EntityKind::Colors => {
                    color_ids = self.upsert_kind(
                        parse_section::<Color>(&root, section, &mut result),
                        self.store.list_colors(),
                        |c| self.store.insert_color(c),
                        |c| self.store.update_color(c),
                        &mut result,
                    );
                }
                EntityKind::Patterns => {
                    pattern_ids = self.upsert_kind(
                        parse_section::<Pattern>(&root, section, &mut result),
                        self.store.list_patterns(),
                        |p| self.store.insert_pattern(p),
                        |p| self.store.update_pattern(p),
                        &mut result,
                    );
                }
                EntityKind::Links => {
                    let mut links = Vec::new();
                    for (idx, link) in parse_section::<ColorLink>(&root, section, &mut result) {
                        let label = format!("{section}[{idx}] ({})", link.sku_filho);
                        let Some(tissue_id) = Self::parent(&tissue_ids, "tissue", &link.tissue_id, &label, &mut result) else {
                            continue;
                        };
                        let Some(color_id) = Self::parent(&color_ids, "color", &link.color_id, &label, &mut result) else {
                            continue;
                        };
                        let mut link = clear_color_view(link);
                        link.tissue_id = tissue_id;
                        link.color_id = color_id;
                        self.restore_image(&mut link.image, &attachments, &label, &mut result);
                        links.push((idx, link));
                    }
                    self.upsert_kind(
                        links,
                        self.store.list_links(),
                        |l| self.store.insert_link(l),
                        |l| self.store.update_link(l),
                        &mut result,
                    );
                }
                EntityKind::PatternLinks => {
                    let mut links = Vec::new();
                    for (idx, link) in parse_section::<PatternLink>(&root, section, &mut result) {
                        let label = format!("{section}[{idx}] ({})", link.sku_filho);
                        let Some(tissue_id) = Self::parent(&tissue_ids, "tissue", &link.tissue_id, &label, &mut result) else {
                            continue;
                        };
                        let Some(pattern_id) = Self::parent(&pattern_ids, "pattern", &link.pattern_id, &label, &mut result) else {
                            continue;
                        };
                        let mut link = clear_pattern_view(link);
                        link.tissue_id = tissue_id;
                        link.pattern_id = pattern_id;
                        self.restore_image(&mut link.image, &attachments, &label, &mut result);
                        links.push((idx, link));
                    }
                    self.upsert_kind(
                        links,
                        self.store.list_pattern_links(),
                        |l| self.store.insert_pattern_link(l),
                        |l| self.store.update_pattern_link(l),
                        &mut result,
                    );
                }
            }
        }

        self.restore_settings(&root, &mut result);

        if let Err(e) = self.store.finish_batch() {
            tracing::warn!(error = %e, "import batch rolled back");
            result.push(ImportIssue::store(format!(
                "catalog changes could not be saved and were rolled back: {e}"
            )));
            result.inserted = KindCounts::default();
            result.updated = KindCounts::default();
        }

        tracing::info!(
            version,
            inserted = result.inserted.total(),
            updated = result.updated.total(),
            issues = result.issues.len(),
            "imported full export"
        );
        Ok(result)
    }

    /// Upsert one kind by natural key and report where each payload id landed.
    fn upsert_kind<R: ImportRecord>(
        &self,
        records: Vec<(usize, R)>,
        existing: StoreResult<Vec<R>>,
        insert: impl Fn(R) -> StoreResult<R>,
        update: impl Fn(&R) -> StoreResult<()>,
        result: &mut ImportResult,
    ) -> IdMap {
        let kind = R::KIND;
        let mut ids = IdMap::default();

        let existing = match existing {
            Ok(existing) => existing,
            Err(e) => {
                result.push(ImportIssue::store(format!(
                    "could not list existing {kind}: {e}; {} records skipped",
                    records.len()
                )));
                for (_, record) in &records {
                    ids.skip(record.id());
                }
                return ids;
            }
        };

        let mut by_key: HashMap<String, R> = HashMap::with_capacity(existing.len());
        let mut owner: HashMap<String, String> = HashMap::with_capacity(existing.len());
        for record in existing {
            ids.known.insert(record.id().to_string());
            owner.insert(record.id().to_string(), record.natural_key());
            by_key.insert(record.natural_key(), record);
        }

        for (idx, mut record) in records {
            let label = format!("{kind}[{idx}] ({})", record.code());
            let key = record.natural_key();
            let incoming = record.id().to_string();
            let claimed_elsewhere = !incoming.is_empty()
                && owner.get(&incoming).is_some_and(|owner_key| *owner_key != key);

            match by_key.get(&key).map(|current| current.id().to_string()) {
                Some(current_id) => {
                    if claimed_elsewhere {
                        result.push(ImportIssue::validation(format!(
                            "{label}: id {incoming} belongs to a different record than {current_id}; record skipped"
                        )));
                        ids.skip(&incoming);
                        continue;
                    }
                    record.set_id(current_id.clone());
                    match update(&record) {
                        Ok(()) => {
                            tracing::debug!(%kind, code = record.code(), "updated");
                            result.updated.increment(kind);
                            if !incoming.is_empty() {
                                ids.remap.insert(incoming, current_id);
                            }
                            by_key.insert(key, record);
                        }
                        Err(e) => {
                            result.push(ImportIssue::store(format!("{label}: update failed: {e}")));
                            ids.skip(&incoming);
                        }
                    }
                }
                None => {
                    if claimed_elsewhere {
                        result.push(ImportIssue::validation(format!(
                            "{label}: id {incoming} already belongs to another {kind} record; record skipped"
                        )));
                        ids.skip(&incoming);
                        continue;
                    }
                    match insert(record) {
                        Ok(saved) => {
                            tracing::debug!(%kind, code = saved.code(), "inserted");
                            result.inserted.increment(kind);
                            let saved_id = saved.id().to_string();
                            ids.known.insert(saved_id.clone());
                            owner.insert(saved_id.clone(), key.clone());
                            if !incoming.is_empty() {
                                ids.remap.insert(incoming, saved_id);
                            }
                            by_key.insert(key, saved);
                        }
                        Err(e) => {
                            result.push(ImportIssue::store(format!("{label}: insert failed: {e}")));
                            ids.skip(&incoming);
                        }
                    }
                }
            }
        }
        ids
    }

    fn parent(
        ids: &IdMap,
        parent: &str,
        id: &str,
        label: &str,
        result: &mut ImportResult,
    ) -> Option<String> {
        let resolved = ids.resolve(id);
        if resolved.is_none() {
            result.push(ImportIssue::validation(format!(
                "{label}: {parent} {id} is not in the payload or the catalog; link skipped"
            )));
        }
        resolved
    }

    fn attachment_table(root: &Map<String, Value>, result: &mut ImportResult) -> HashMap<String, Attachment> {
        let mut table = HashMap::new();
        for (_, attachment) in parse_section::<Attachment>(root, "attachments", result) {
            table.entry(attachment.hash.clone()).or_insert(attachment);
        }
        table
    }

    /// Fill missing image fields from the attachment table, then persist the
    /// image bytes when an image store is attached.
    fn restore_image(
        &self,
        image: &mut LinkImage,
        attachments: &HashMap<String, Attachment>,
        label: &str,
        result: &mut ImportResult,
    ) {
        if let Some(attachment) = image.content_key().and_then(|key| attachments.get(key)) {
            if image.image.is_none() {
                image.image = attachment.data.clone();
            }
            if image.image_thumb.is_none() {
                image.image_thumb = attachment.thumb.clone();
            }
            if image.image_mime.is_none() {
                image.image_mime = attachment.mime.clone();
            }
        }

        let (Some(images), Some(data)) = (self.images, image.image.as_deref()) else {
            return;
        };
        match decode_data_url(data) {
            Ok((embedded_mime, bytes)) => {
                let mime = image.image_mime.as_deref().or(embedded_mime.as_deref());
                match images.put(mime, &bytes) {
                    Ok(stored) => image.image_path = Some(stored.path),
                    Err(e) => {
                        result.push(ImportIssue::store(format!("{label}: image not stored: {e}")))
                    }
                }
            }
            Err(e) => result.push(ImportIssue::validation(format!(
                "{label}: image data unreadable: {e}"
            ))),
        }
    }

    /// Best-effort settings write. Empty settings leave local ones alone.
    fn restore_settings(&self, root: &Map<String, Value>, result: &mut ImportResult) {
        let Some(value) = root.get("settings") else {
            return;
        };
        match serde_json::from_value::<Settings>(value.clone()) {
            Ok(settings) if settings.is_empty() => {}
            Ok(settings) => {
                if let Err(e) = self.store.write_settings(&settings) {
                    result.push(ImportIssue::store(format!("settings not restored: {e}")));
                }
            }
            Err(e) => result.push(ImportIssue::validation(format!("settings unreadable: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rzt_store::{InMemoryCatalogStore, InMemoryImageStore};
    use serde_json::json;

    use crate::issue::IssueKind;

    fn v4(body: Value) -> String {
        let mut root = json!({
            "schema": SCHEMA,
            "version": 4,
            "tissues": [], "colors": [], "patterns": [],
            "links": [], "patternLinks": [], "attachments": [],
            "integrity": { "hashAlgorithm": "SHA-256", "hashHex": "00".repeat(32) }
        });
        for (k, v) in body.as_object().unwrap() {
            root[k] = v.clone();
        }
        root.to_string()
    }

    fn tissue(id: &str, sku: &str) -> Value {
        json!({ "id": id, "name": "Helanca", "width": 160, "composition": "-", "sku": sku })
    }

    fn color(id: &str, sku: &str) -> Value {
        json!({ "id": id, "name": "Azul", "hex": "#2233ff", "sku": sku })
    }

    fn pattern(id: &str, sku: &str) -> Value {
        json!({ "id": id, "family": "Floral", "name": "Rosas", "sku": sku })
    }

    #[test]
    fn parse_failure_is_fatal_and_writes_nothing() {
        let store = InMemoryCatalogStore::new();
        let err = ImportEngine::new(&store).import_exact("{\"tissues\": [").unwrap_err();
        assert!(matches!(err, BackupError::Parse(_)));
        assert!(store.is_empty().unwrap());

        let err = ImportEngine::new(&store).import_exact("[1,2,3]").unwrap_err();
        assert!(matches!(err, BackupError::Parse(_)));
    }

    #[test]
    fn second_import_updates_by_sku() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({ "tissues": [tissue("t1", "T001")], "colors": [color("c1", "AZ001")] }));
        let first = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(first.inserted.tissues, 1);
        assert_eq!(first.inserted.colors, 1);

        let second = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(second.inserted.total(), 0);
        assert_eq!(second.updated.tissues, 1);
        assert_eq!(second.updated.colors, 1);
        assert_eq!(store.list_tissues().unwrap().len(), 1);
    }

    #[test]
    fn links_are_never_synthesized() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({ "tissues": [tissue("t1", "T001")], "colors": [color("c1", "AZ001")] }));
        let result = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(result.inserted.links, 0);
        assert!(store.list_links().unwrap().is_empty());
    }

    #[test]
    fn links_are_repointed_to_matched_parents() {
        let store = InMemoryCatalogStore::new();
        store
            .insert_tissue(serde_json::from_value(tissue("local-t", "T001")).unwrap())
            .unwrap();

        let raw = v4(json!({
            "tissues": [tissue("remote-t", "T001")],
            "colors": [color("remote-c", "AZ001")],
            "links": [{
                "id": "l1", "tissueId": "remote-t", "colorId": "remote-c",
                "skuFilho": "T001-AZ001", "tissueName": "stale name"
            }]
        }));
        let result = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(result.updated.tissues, 1);
        assert_eq!(result.inserted.links, 1);

        let link = &store.list_links().unwrap()[0];
        assert_eq!(link.tissue_id, "local-t");
        assert_eq!(link.tissue.tissue_name.as_deref(), Some("Helanca"));
    }

    #[test]
    fn pattern_links_follow_matched_patterns_and_upsert() {
        let store = InMemoryCatalogStore::new();
        store
            .insert_pattern(serde_json::from_value(pattern("local-p", "FL001")).unwrap())
            .unwrap();

        let raw = v4(json!({
            "tissues": [tissue("t1", "T001")],
            "patterns": [pattern("remote-p", "FL001")],
            "patternLinks": [{
                "id": "pl1", "tissueId": "t1", "patternId": "remote-p",
                "skuFilho": "T001-FL001", "patternName": "stale name"
            }]
        }));
        let first = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert!(!first.has_issues(), "{:?}", first.issues);
        assert_eq!(first.updated.patterns, 1);
        assert_eq!(first.inserted.pattern_links, 1);

        let stored = &store.list_pattern_links().unwrap()[0];
        assert_eq!(stored.pattern_id, "local-p");
        assert_eq!(stored.pattern_sku.as_deref(), Some("FL001"));
        assert_eq!(stored.pattern_name.as_deref(), Some("Rosas"));

        let second = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(second.inserted.pattern_links, 0);
        assert_eq!(second.updated.pattern_links, 1);
        assert_eq!(store.list_pattern_links().unwrap().len(), 1);
    }

    #[test]
    fn pattern_link_to_unknown_pattern_is_skipped() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({
            "tissues": [tissue("t1", "T001")],
            "patternLinks": [{ "tissueId": "t1", "patternId": "ghost", "skuFilho": "T001-FL009" }]
        }));
        let result = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(result.inserted.pattern_links, 0);
        assert!(result
            .issues
            .iter()
            .any(|i| i.message.starts_with("patternLinks[0]") && i.message.contains("pattern ghost")));
    }

    #[test]
    fn unknown_parent_skips_link() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({
            "colors": [color("c1", "AZ001")],
            "links": [{ "tissueId": "ghost", "colorId": "c1", "skuFilho": "T9-AZ001" }]
        }));
        let result = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(result.inserted.links, 0);
        assert!(result.issues.iter().any(|i| i.message.contains("tissue ghost")));
    }

    #[test]
    fn id_claimed_by_another_sku_is_a_validation_issue() {
        let store = InMemoryCatalogStore::new();
        store
            .insert_color(serde_json::from_value(color("c1", "AZ001")).unwrap())
            .unwrap();

        let raw = v4(json!({
            "colors": [color("c1", "VM001")],
            "links": [{ "tissueId": "t1", "colorId": "c1", "skuFilho": "T001-VM001" }],
            "tissues": [tissue("t1", "T001")]
        }));
        let result = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(result.inserted.colors, 0);
        assert_eq!(store.list_colors().unwrap()[0].sku, "AZ001");
        assert!(result
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::Validation && i.message.contains("id c1")));
        // the link pointed at the skipped color, so it must not attach to AZ001
        assert_eq!(result.inserted.links, 0);
    }

    #[test]
    fn bad_record_is_skipped_and_batch_continues() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({
            "tissues": [
                { "id": "t0", "name": "No SKU", "width": 150, "composition": "-", "sku": "" },
                { "id": "t1", "name": "Broken" },
                tissue("t2", "T002")
            ]
        }));
        let result = ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(result.inserted.tissues, 1);
        assert_eq!(result.issues.len(), 2);
        assert!(result.issues[0].message.starts_with("tissues[0]"));
        assert!(result.issues[1].message.starts_with("tissues[1]"));
    }

    #[test]
    fn attachment_hydrates_and_is_stored() {
        let store = InMemoryCatalogStore::new();
        let images = InMemoryImageStore::new();
        let raw = v4(json!({
            "tissues": [tissue("t1", "T001")],
            "colors": [color("c1", "AZ001")],
            "links": [{
                "tissueId": "t1", "colorId": "c1", "skuFilho": "T001-AZ001",
                "imageHash": "h1"
            }],
            "attachments": [{ "hash": "h1", "mime": "image/png", "data": "data:image/png;base64,cGl4ZWxz" }]
        }));
        let result = ImportEngine::new(&store)
            .with_images(&images)
            .import_exact(&raw)
            .unwrap();
        assert!(!result.has_issues(), "{:?}", result.issues);

        let link = &store.list_links().unwrap()[0];
        assert_eq!(link.image.image.as_deref(), Some("data:image/png;base64,cGl4ZWxz"));
        assert_eq!(link.image.image_mime.as_deref(), Some("image/png"));
        let path = link.image.image_path.as_deref().unwrap();
        assert_eq!(images.get(path).unwrap().unwrap().bytes, b"pixels");
    }

    #[test]
    fn inline_image_is_the_fallback() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({
            "tissues": [tissue("t1", "T001")],
            "colors": [color("c1", "AZ001")],
            "links": [{
                "tissueId": "t1", "colorId": "c1", "skuFilho": "T001-AZ001",
                "imageHash": "missing", "image": "data:image/png;base64,AAAA"
            }]
        }));
        ImportEngine::new(&store).import_exact(&raw).unwrap();
        let link = &store.list_links().unwrap()[0];
        assert_eq!(link.image.image.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn settings_are_restored() {
        let store = InMemoryCatalogStore::new();
        let raw = v4(json!({ "settings": { "deltaThreshold": 2.5 } }));
        ImportEngine::new(&store).import_exact(&raw).unwrap();
        assert_eq!(store.read_settings().unwrap().delta_threshold, Some(2.5));
    }

    #[test]
    fn future_version_imports_with_issue() {
        let store = InMemoryCatalogStore::new();
        let mut root: Value = serde_json::from_str(&v4(json!({ "colors": [color("c1", "AZ001")] }))).unwrap();
        root["version"] = json!(5);
        let result = ImportEngine::new(&store).import_exact(&root.to_string()).unwrap();
        assert_eq!(result.inserted.colors, 1);
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::Version));
    }
}
