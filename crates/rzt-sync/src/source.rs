//! Where cloud backups come from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use rzt_backup::{payload_version, stamped_digest, CloudManifest};

use crate::error::{SyncError, SyncResult};
use crate::types::BackupEntry;

/// Remote storage holding backups and the manifest of the latest one.
#[async_trait]
pub trait BackupSource: Send + Sync {
    /// Manifest of the latest backup, if one was published.
    async fn fetch_manifest(&self) -> SyncResult<Option<CloudManifest>>;

    /// Raw text of the latest backup.
    async fn download_latest(&self) -> SyncResult<Option<String>>;

    /// Raw text of a specific stored backup.
    async fn download_named(&self, name: &str) -> SyncResult<Option<String>>;

    async fn list_backups(&self) -> SyncResult<Vec<BackupEntry>>;
}

/// Build the manifest describing `json`.
pub fn manifest_for(json: &str, updated_at: DateTime<Utc>) -> SyncResult<CloudManifest> {
    let root: Value =
        serde_json::from_str(json).map_err(|e| SyncError::InvalidPayload(e.to_string()))?;
    let hash = stamped_digest(&root)
        .ok_or_else(|| SyncError::InvalidPayload("payload carries no integrity hash".into()))?;
    let version = u32::try_from(payload_version(&root))
        .map_err(|_| SyncError::InvalidPayload("version out of range".into()))?;
    Ok(CloudManifest {
        hash: hash.to_hex(),
        updated_at,
        version,
        size_bytes: Some(json.len() as u64),
    })
}

#[derive(Debug, Default)]
struct MemoryState {
    manifest: Option<CloudManifest>,
    latest: Option<String>,
    named: BTreeMap<String, (String, DateTime<Utc>)>,
}

/// In-process backup source.
#[derive(Debug, Default)]
pub struct InMemoryBackupSource {
    state: RwLock<MemoryState>,
}

impl InMemoryBackupSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `json` under `name`, make it the latest, and rewrite the manifest.
    pub fn publish(&self, name: &str, json: &str, updated_at: DateTime<Utc>) -> SyncResult<CloudManifest> {
        let manifest = manifest_for(json, updated_at)?;
        let mut state = self.write()?;
        state.named.insert(name.to_string(), (json.to_string(), updated_at));
        state.latest = Some(json.to_string());
        state.manifest = Some(manifest.clone());
        Ok(manifest)
    }

    /// Replace the manifest without touching the stored backups.
    pub fn set_manifest(&self, manifest: Option<CloudManifest>) -> SyncResult<()> {
        self.write()?.manifest = manifest;
        Ok(())
    }

    /// Replace the latest backup text without touching the manifest.
    pub fn set_latest(&self, json: Option<String>) -> SyncResult<()> {
        self.write()?.latest = json;
        Ok(())
    }

    fn read(&self) -> SyncResult<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| SyncError::Source(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> SyncResult<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| SyncError::Source(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl BackupSource for InMemoryBackupSource {
    async fn fetch_manifest(&self) -> SyncResult<Option<CloudManifest>> {
        Ok(self.read()?.manifest.clone())
    }

    async fn download_latest(&self) -> SyncResult<Option<String>> {
        Ok(self.read()?.latest.clone())
    }

    async fn download_named(&self, name: &str) -> SyncResult<Option<String>> {
        Ok(self.read()?.named.get(name).map(|(json, _)| json.clone()))
    }

    async fn list_backups(&self) -> SyncResult<Vec<BackupEntry>> {
        let state = self.read()?;
        let mut entries: Vec<BackupEntry> = state
            .named
            .iter()
            .map(|(name, (json, updated_at))| BackupEntry {
                name: name.clone(),
                updated_at: *updated_at,
                size_bytes: Some(json.len() as u64),
            })
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }
}

/// Backups kept in a directory (a mounted bucket or a sync folder).
///
/// Layout: `manifest.json`, `latest.json`, plus any number of named
/// `*.json` backups.
#[derive(Debug, Clone)]
pub struct DirBackupSource {
    root: PathBuf,
}

const MANIFEST_FILE: &str = "manifest.json";
const LATEST_FILE: &str = "latest.json";

impl DirBackupSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `json` as `name` and as the latest backup, then the manifest.
    pub async fn publish(&self, name: &str, json: &str) -> SyncResult<CloudManifest> {
        let manifest = manifest_for(json, Utc::now())?;
        tokio::fs::create_dir_all(&self.root).await?;
        let named = self.named_path(name)?;
        write_atomic(&named, json.as_bytes()).await?;
        write_atomic(&self.root.join(LATEST_FILE), json.as_bytes()).await?;
        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        write_atomic(&self.root.join(MANIFEST_FILE), &manifest_json).await?;
        tracing::info!(name, hash = %manifest.hash, "published backup");
        Ok(manifest)
    }

    fn named_path(&self, name: &str) -> SyncResult<PathBuf> {
        let valid = !name.is_empty()
            && name.ends_with(".json")
            && name != MANIFEST_FILE
            && name != LATEST_FILE
            && !name.contains(['/', '\\'])
            && !name.starts_with('.');
        if valid {
            Ok(self.root.join(name))
        } else {
            Err(SyncError::NotFound(name.to_string()))
        }
    }
}

async fn read_optional(path: &Path) -> SyncResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> SyncResult<()> {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| SyncError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| SyncError::Source(e.to_string()))?
}

#[async_trait]
impl BackupSource for DirBackupSource {
    async fn fetch_manifest(&self) -> SyncResult<Option<CloudManifest>> {
        let Some(text) = read_optional(&self.root.join(MANIFEST_FILE)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| SyncError::Serialization(format!("{MANIFEST_FILE}: {e}")))
    }

    async fn download_latest(&self) -> SyncResult<Option<String>> {
        read_optional(&self.root.join(LATEST_FILE)).await
    }

    async fn download_named(&self, name: &str) -> SyncResult<Option<String>> {
        read_optional(&self.named_path(name)?).await
    }

    async fn list_backups(&self) -> SyncResult<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.named_path(&name).is_err() {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(BackupEntry {
                name,
                updated_at: DateTime::<Utc>::from(metadata.modified()?),
                size_bytes: Some(metadata.len()),
            });
        }
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.name.cmp(&b.name)));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> String {
        json!({
            "schema": "razai-tools.full-export",
            "version": 4,
            "integrity": { "hashAlgorithm": "SHA-256", "hashHex": "ab".repeat(32) }
        })
        .to_string()
    }

    #[test]
    fn manifest_describes_payload() {
        let at = Utc::now();
        let manifest = manifest_for(&payload(), at).unwrap();
        assert_eq!(manifest.hash, "ab".repeat(32));
        assert_eq!(manifest.version, 4);
        assert_eq!(manifest.updated_at, at);
        assert_eq!(manifest.size_bytes, Some(payload().len() as u64));
    }

    #[test]
    fn unstamped_payload_has_no_manifest() {
        let err = manifest_for(r#"{"version":3}"#, Utc::now()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn memory_source_publishes_latest() {
        let source = InMemoryBackupSource::new();
        assert!(source.fetch_manifest().await.unwrap().is_none());

        source.publish("a.json", &payload(), Utc::now()).unwrap();
        assert!(source.fetch_manifest().await.unwrap().is_some());
        assert_eq!(source.download_latest().await.unwrap(), Some(payload()));
        assert_eq!(source.download_named("a.json").await.unwrap(), Some(payload()));
        assert_eq!(source.list_backups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dir_source_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirBackupSource::new(dir.path());
        assert!(source.fetch_manifest().await.unwrap().is_none());
        assert!(source.download_latest().await.unwrap().is_none());

        let manifest = source.publish("backup-1.json", &payload()).await.unwrap();
        assert_eq!(source.fetch_manifest().await.unwrap(), Some(manifest));
        assert_eq!(source.download_latest().await.unwrap(), Some(payload()));

        let listed = source.list_backups().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["backup-1.json"]);
    }

    #[tokio::test]
    async fn dir_source_rejects_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirBackupSource::new(dir.path());
        for name in ["../x.json", "manifest.json", "notes.txt", ".hidden.json"] {
            assert!(source.download_named(name).await.is_err(), "{name}");
        }
    }
}
