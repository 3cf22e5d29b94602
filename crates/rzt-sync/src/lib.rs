//! Cloud restore for Razai Tools catalogs.
//!
//! A [`BackupSource`] publishes full exports together with a manifest of the
//! latest one. [`CloudRestorer`] decides whether a backup should be imported,
//! verifies it against the manifest, and hands it to the backup worker.

pub mod error;
pub mod ledger;
pub mod restorer;
pub mod source;
pub mod types;

pub use error::{SyncError, SyncResult};
pub use ledger::{JsonFileLedger, MemoryLedger, RestoreLedger};
pub use restorer::CloudRestorer;
pub use source::{manifest_for, BackupSource, DirBackupSource, InMemoryBackupSource};
pub use types::{BackupEntry, RestoreOutcome, SkipReason, SyncConfig};
