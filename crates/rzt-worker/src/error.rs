use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("backup error: {0}")]
    Backup(#[from] rzt_backup::BackupError),

    #[error("verification failed: {0}")]
    Verification(String),

    /// The worker answered `ok: false`.
    #[error("worker reported failure: {0}")]
    Failed(String),

    #[error("worker answered with an incomplete result: missing {0}")]
    IncompleteResult(&'static str),

    #[error("no result within {0:?}; the operation keeps running")]
    Timeout(Duration),

    #[error("worker thread could not be started: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker channel closed")]
    Disconnected,

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
