//! Hashing primitives for Razai Tools backups.
//!
//! Two hashers with different jobs:
//!
//! - [`CanonicalHasher`]: SHA-256 over the canonical JSON of a payload's
//!   content sections; this is the integrity stamp.
//! - [`ContentHasher`]: domain-separated BLAKE3 over raw blob bytes; this is
//!   the address under which the image store keeps a blob.
//!
//! All crypto operations wrap established libraries.

pub mod canonical;
pub mod content;

pub use canonical::{canonical_json, CanonicalHasher, HashInput, HasherError, HASHED_FIELDS};
pub use content::ContentHasher;
