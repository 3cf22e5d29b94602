//! Manifest-gated restore of cloud backups.
//!
//! Every path verifies the downloaded text before handing it to the worker;
//! only a successful import advances the ledger.

use std::sync::Arc;

use chrono::Utc;

use rzt_backup::{CloudManifest, IntegrityVerifier};
use rzt_store::CatalogStore;
use rzt_worker::{BackupClient, WorkerError};

use crate::error::{SyncError, SyncResult};
use crate::ledger::RestoreLedger;
use crate::source::BackupSource;
use crate::types::{BackupEntry, RestoreOutcome, SkipReason, SyncConfig};

pub struct CloudRestorer {
    source: Arc<dyn BackupSource>,
    ledger: Arc<dyn RestoreLedger>,
    store: Arc<dyn CatalogStore>,
    client: BackupClient,
    config: SyncConfig,
}

impl CloudRestorer {
    pub fn new(
        source: Arc<dyn BackupSource>,
        ledger: Arc<dyn RestoreLedger>,
        store: Arc<dyn CatalogStore>,
        client: BackupClient,
    ) -> Self {
        Self {
            source,
            ledger,
            store,
            client,
            config: SyncConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Import the latest backup when its manifest is newer than the last import.
    pub async fn auto_import_if_needed(&mut self) -> SyncResult<RestoreOutcome> {
        if !self.config.auto {
            return Ok(skipped(SkipReason::AutoDisabled));
        }
        let Some(manifest) = self.source.fetch_manifest().await? else {
            return Ok(skipped(SkipReason::NoManifest));
        };
        if let Some(last) = self.ledger.last_import().await? {
            if manifest.updated_at <= last {
                tracing::debug!(%last, updated_at = %manifest.updated_at, "cloud backup already imported");
                return Ok(skipped(SkipReason::NoNewerBackup));
            }
        }
        let Some(json) = self.source.download_latest().await? else {
            return Ok(skipped(SkipReason::NoBackup));
        };
        self.verify_and_import(Some(&manifest), json).await
    }

    /// Import the latest backup regardless of timestamps.
    pub async fn manual_restore_latest(&mut self) -> SyncResult<RestoreOutcome> {
        let manifest = self.source.fetch_manifest().await?;
        let Some(json) = self.source.download_latest().await? else {
            return Ok(skipped(SkipReason::NoBackup));
        };
        self.verify_and_import(manifest.as_ref(), json).await
    }

    /// Import one listed backup. Named backups have no manifest, so only the
    /// stamped hash is checked.
    pub async fn restore_named(&mut self, name: &str) -> SyncResult<RestoreOutcome> {
        let json = self
            .source
            .download_named(name)
            .await?
            .ok_or_else(|| SyncError::NotFound(name.to_string()))?;
        self.verify_and_import(None, json).await
    }

    /// First-run restore: an empty catalog takes the latest backup whatever
    /// its age. A populated catalog falls back to the auto rule.
    pub async fn bootstrap_if_empty(&mut self) -> SyncResult<RestoreOutcome> {
        if !self.config.auto {
            return Ok(skipped(SkipReason::AutoDisabled));
        }
        if !self.store.is_empty()? {
            return self.auto_import_if_needed().await;
        }
        let manifest = self.source.fetch_manifest().await?;
        let Some(json) = self.source.download_latest().await? else {
            return Ok(skipped(SkipReason::NoBackup));
        };
        self.verify_and_import(manifest.as_ref(), json).await
    }

    pub async fn list_backups(&self) -> SyncResult<Vec<BackupEntry>> {
        self.source.list_backups().await
    }

    pub fn shutdown(self) {
        self.client.shutdown();
    }

    async fn verify_and_import(
        &mut self,
        manifest: Option<&CloudManifest>,
        json: String,
    ) -> SyncResult<RestoreOutcome> {
        let verification = IntegrityVerifier::verify(manifest, &json);
        if let Some(failure) = verification.failure() {
            tracing::warn!(reason = %failure, "cloud backup rejected");
            return Ok(RestoreOutcome::Rejected(failure.to_string()));
        }

        let output = match self.client.import(json).await {
            Ok(output) => output,
            Err(WorkerError::Failed(reason)) => {
                tracing::warn!(%reason, "worker refused cloud backup");
                return Ok(RestoreOutcome::Rejected(reason));
            }
            Err(e) => return Err(e.into()),
        };

        self.ledger.record_import(Utc::now()).await?;
        tracing::info!(
            inserted = output.inserted.total(),
            updated = output.updated.total(),
            issues = output.issues.len(),
            "cloud backup imported"
        );
        Ok(RestoreOutcome::Imported(output))
    }
}

fn skipped(reason: SkipReason) -> RestoreOutcome {
    tracing::debug!(%reason, "restore skipped");
    RestoreOutcome::Skipped(reason)
}
