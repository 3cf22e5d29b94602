//! Full-backup pipeline for Razai Tools catalogs.
//!
//! - [`ExportBuilder`] assembles a stamped [`FullExportPayload`](rzt_types::FullExportPayload).
//! - [`IntegrityVerifier`] checks raw payload text against an optional
//!   [`CloudManifest`] and against its own stamp.
//! - [`ImportEngine`] reproduces a payload of any known version in a
//!   [`CatalogStore`](rzt_store::CatalogStore), reporting non-fatal issues.
//! - [`validate_payload_shape`] is the store-free dry run.

pub mod error;
pub mod export;
pub mod import;
pub mod issue;
mod migrate;
pub mod validate;
pub mod verify;

pub use error::{BackupError, BackupResult};
pub use export::{ExportBuilder, ExportInputs, SettingsRead};
pub use import::ImportEngine;
pub use issue::{ImportIssue, ImportResult, IssueKind};
pub use validate::{shape_issues, validate_payload_shape};
pub use verify::{
    payload_version, stamped_digest, CloudManifest, IntegrityFailure, IntegrityVerifier,
    Verification,
};
