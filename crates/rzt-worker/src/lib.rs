//! Off-thread execution of backup builds and imports.
//!
//! The worker speaks a two-message protocol (`build`, `import`) and answers
//! each recognized request with exactly one `result` message carrying either
//! the output and its timing or a serialized error.

pub mod bridge;
pub mod client;
pub mod error;
pub mod protocol;

pub use bridge::WorkerBridge;
pub use client::{BackupClient, BuildOutput, ImportOutput};
pub use error::{WorkerError, WorkerResult};
pub use protocol::{ResultMessage, WorkerRequest, WorkerResponse};
