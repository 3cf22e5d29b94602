use rzt_crypto::HasherError;
use rzt_store::StoreError;
use thiserror::Error;

/// Fatal backup errors. Everything non-fatal travels as an import issue or a
/// verification outcome instead.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The raw text is not a JSON object. Nothing was written.
    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("hash error: {0}")]
    Hasher(#[from] HasherError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type BackupResult<T> = Result<T, BackupError>;
