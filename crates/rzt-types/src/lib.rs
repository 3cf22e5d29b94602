//! Foundation types for Razai Tools catalog backups.
//!
//! Every other `rzt-*` crate depends on `rzt-types`.
//!
//! # Key Types
//!
//! - [`FullExportPayload`]: versioned snapshot of the whole catalog
//! - [`Tissue`], [`Color`], [`Pattern`]: independent catalog entities
//! - [`ColorLink`], [`PatternLink`]: denormalized relationship views
//! - [`Attachment`]: content-addressed image blob
//! - [`Digest`]: 256-bit integrity digest, 64 lowercase hex chars on the wire
//! - [`EntityKind`], [`KindCounts`]: per-kind bookkeeping

pub mod digest;
pub mod entity;
pub mod error;
pub mod kind;
pub mod payload;

pub use digest::Digest;
pub use entity::{
    Color, ColorLink, HasLinkImage, LinkImage, LinkStatus, Pattern, PatternLink, Tissue,
    TissueView,
};
pub use error::TypeError;
pub use kind::{EntityKind, KindCounts};
pub use payload::{
    Attachment, ExportCounts, FullExportPayload, HueBoundaries, Integrity, Settings,
    CURRENT_VERSION, HASH_ALGORITHM, SCHEMA,
};
