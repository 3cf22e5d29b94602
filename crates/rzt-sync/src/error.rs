use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backup source error: {0}")]
    Source(String),

    #[error("backup {0} not found")]
    NotFound(String),

    #[error("invalid backup payload: {0}")]
    InvalidPayload(String),

    #[error("restore ledger error: {0}")]
    Ledger(String),

    #[error("worker error: {0}")]
    Worker(#[from] rzt_worker::WorkerError),

    #[error("store error: {0}")]
    Store(#[from] rzt_store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
