use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Remembers when a cloud backup was last imported.
#[async_trait]
pub trait RestoreLedger: Send + Sync {
    async fn last_import(&self) -> SyncResult<Option<DateTime<Utc>>>;
    async fn record_import(&self, at: DateTime<Utc>) -> SyncResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    last: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            last: RwLock::new(Some(at)),
        }
    }
}

#[async_trait]
impl RestoreLedger for MemoryLedger {
    async fn last_import(&self) -> SyncResult<Option<DateTime<Utc>>> {
        self.last
            .read()
            .map(|guard| *guard)
            .map_err(|e| SyncError::Ledger(format!("lock poisoned: {e}")))
    }

    async fn record_import(&self, at: DateTime<Utc>) -> SyncResult<()> {
        let mut guard = self
            .last
            .write()
            .map_err(|e| SyncError::Ledger(format!("lock poisoned: {e}")))?;
        *guard = Some(at);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_import_at: Option<DateTime<Utc>>,
}

/// Ledger persisted as a small JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileLedger {
    path: PathBuf,
}

impl JsonFileLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RestoreLedger for JsonFileLedger {
    async fn last_import(&self) -> SyncResult<Option<DateTime<Utc>>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: LedgerFile = serde_json::from_str(&text)
            .map_err(|e| SyncError::Ledger(format!("{}: {e}", self.path.display())))?;
        Ok(file.last_import_at)
    }

    async fn record_import(&self, at: DateTime<Utc>) -> SyncResult<()> {
        let bytes = serde_json::to_vec_pretty(&LedgerFile {
            last_import_at: Some(at),
        })
        .map_err(|e| SyncError::Serialization(e.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> SyncResult<()> {
            use std::io::Write;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&path).map_err(|e| SyncError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| SyncError::Ledger(e.to_string()))??;
        tracing::debug!(path = %self.path.display(), %at, "recorded import");
        Ok(())
    }
}
