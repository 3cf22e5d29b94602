use rzt_types::EntityKind;

/// Errors from catalog and image store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("{kind} record not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A record with this id already exists.
    #[error("{kind} record already exists: {id}")]
    Duplicate { kind: EntityKind, id: String },

    /// The requested image blob was not found.
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// Image data could not be decoded.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding in-memory state was poisoned.
    #[error("lock poisoned: {0}")]
    Lock(String),

    /// The backend cannot serve this request right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
