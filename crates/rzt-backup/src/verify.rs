//! Two-layer integrity verification of a raw export.
//!
//! Layer one compares an external manifest's hash with the payload's stamped
//! hash (wrong file delivered). Layer two recomputes the digest from the
//! payload's content sections (right file, altered content).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use rzt_crypto::CanonicalHasher;
use rzt_types::{Digest, CURRENT_VERSION, SCHEMA};

/// Descriptor stored next to the latest cloud backup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudManifest {
    #[serde(alias = "hashHex")]
    pub hash: String,
    #[serde(alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
    pub version: u32,
    #[serde(default, alias = "size_bytes", skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Why a payload failed verification.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntegrityFailure {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("unrecognized schema: {}", .0.as_deref().unwrap_or("<missing>"))]
    SchemaMismatch(Option<String>),

    #[error("unsupported future version {0}")]
    UnsupportedVersion(u64),

    #[error("payload carries no integrity hash")]
    IntegrityMissing,

    #[error("manifest carries no hash")]
    ManifestMissingHash,

    #[error("manifest divergence: manifest hash {manifest} does not match payload hash {payload}")]
    ManifestDivergence { manifest: String, payload: String },

    #[error("payload tampered: stamped hash {expected} does not match recomputed {actual}")]
    PayloadTampered { expected: String, actual: String },
}

impl IntegrityFailure {
    /// True when the delivered file is not the one the manifest describes.
    pub fn is_manifest_divergence(&self) -> bool {
        matches!(self, Self::ManifestDivergence { .. })
    }

    /// True when the content was altered after stamping.
    pub fn is_tampering(&self) -> bool {
        matches!(self, Self::PayloadTampered { .. })
    }
}

/// Verification outcome. Never an error; callers decide how to proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// Both applicable layers passed.
    Verified { digest: Digest },
    /// Pre-v4 payload: there is no stamped hash to check.
    LegacyUnverified { version: u64 },
    Failed(IntegrityFailure),
}

impl Verification {
    pub fn ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Verified { .. } => None,
            Self::LegacyUnverified { version } => {
                Some(format!("legacy version {version} payload carries no integrity hash"))
            }
            Self::Failed(failure) => Some(failure.to_string()),
        }
    }

    pub fn failure(&self) -> Option<&IntegrityFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<IntegrityFailure> for Verification {
    fn from(failure: IntegrityFailure) -> Self {
        Self::Failed(failure)
    }
}

/// Payload version as read from a parsed root. Absent or non-numeric is legacy (0).
pub fn payload_version(root: &Value) -> u64 {
    root.get("version").and_then(Value::as_u64).unwrap_or(0)
}

/// The stamped `integrity.hashHex`, when it is a well-formed digest.
pub fn stamped_digest(root: &Value) -> Option<Digest> {
    root.get("integrity")?
        .get("hashHex")?
        .as_str()?
        .parse()
        .ok()
}

pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Verify raw payload text, optionally against a cloud manifest.
    pub fn verify(manifest: Option<&CloudManifest>, raw: &str) -> Verification {
        match serde_json::from_str::<Value>(raw) {
            Ok(root) => Self::verify_value(manifest, &root),
            Err(e) => IntegrityFailure::Malformed(e.to_string()).into(),
        }
    }

    /// Verify an already parsed payload.
    pub fn verify_value(manifest: Option<&CloudManifest>, root: &Value) -> Verification {
        let verification = Self::check(manifest, root);
        match &verification {
            Verification::Failed(failure) => {
                tracing::warn!(reason = %failure, "payload failed verification")
            }
            Verification::LegacyUnverified { version } => {
                tracing::debug!(version, "legacy payload accepted without hash check")
            }
            Verification::Verified { digest } => {
                tracing::debug!(hash = %digest.short_hex(), "payload verified")
            }
        }
        verification
    }

    fn check(manifest: Option<&CloudManifest>, root: &Value) -> Verification {
        if !root.is_object() {
            return IntegrityFailure::Malformed("payload root is not an object".into()).into();
        }
        match root.get("schema").and_then(Value::as_str) {
            Some(SCHEMA) => {}
            other => return IntegrityFailure::SchemaMismatch(other.map(str::to_string)).into(),
        }

        let version = payload_version(root);
        if version < u64::from(CURRENT_VERSION) {
            return Verification::LegacyUnverified { version };
        }
        if version > u64::from(CURRENT_VERSION) {
            return IntegrityFailure::UnsupportedVersion(version).into();
        }

        let Some(stamped) = stamped_digest(root) else {
            return IntegrityFailure::IntegrityMissing.into();
        };

        if let Some(manifest) = manifest {
            if manifest.hash.is_empty() {
                return IntegrityFailure::ManifestMissingHash.into();
            }
            if manifest.hash != stamped.to_hex() {
                return IntegrityFailure::ManifestDivergence {
                    manifest: manifest.hash.clone(),
                    payload: stamped.to_hex(),
                }
                .into();
            }
        }

        let actual = CanonicalHasher::hash_payload_value(root);
        if actual != stamped {
            return IntegrityFailure::PayloadTampered {
                expected: stamped.to_hex(),
                actual: actual.to_hex(),
            }
            .into();
        }
        Verification::Verified { digest: stamped }
    }
}
