//! The worker side: a dedicated thread fed through a request channel.
//!
//! Requests travel over a `std::sync::mpsc` channel into the worker thread,
//! which runs one operation at a time to completion and posts exactly one
//! [`WorkerResponse`] per recognized request on a tokio channel. Nothing but
//! messages crosses the boundary.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc as async_mpsc;

use rzt_backup::{payload_version, ExportBuilder, ImportEngine, IntegrityVerifier};
use rzt_store::{CatalogStore, ImageStore};
use rzt_types::CURRENT_VERSION;

use crate::error::{WorkerError, WorkerResult};
use crate::protocol::{WorkerRequest, WorkerResponse};

/// What the worker thread owns.
struct WorkerContext {
    store: Arc<dyn CatalogStore>,
    images: Option<Arc<dyn ImageStore>>,
}

impl WorkerContext {
    fn handle(&self, request: &WorkerRequest) -> WorkerResponse {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(request)));
        let ms = started.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(Ok(finished)) => {
                tracing::info!(op = request.type_name(), ms, "worker operation finished");
                finished.finish(ms)
            }
            Ok(Err(e)) => {
                tracing::warn!(op = request.type_name(), ms, error = %e, "worker operation failed");
                WorkerResponse::failed(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(op = request.type_name(), error = %message, "worker operation panicked");
                WorkerResponse::failed(message)
            }
        }
    }

    fn run(&self, request: &WorkerRequest) -> WorkerResult<Finished> {
        match request {
            WorkerRequest::Build => self.build(),
            WorkerRequest::Import { json } => self.import(json),
        }
    }

    fn build(&self) -> WorkerResult<Finished> {
        let mut builder = ExportBuilder::new();
        if let Some(images) = self.images.as_deref() {
            builder = builder.with_images(images);
        }
        let payload = builder.build_from_store(self.store.as_ref())?;
        let json = payload
            .to_json()
            .map_err(|e| WorkerError::Serialization(e.to_string()))?;
        tracing::debug!(size = json.len(), "built backup json");
        Ok(Finished::Built(json))
    }

    fn import(&self, json: &str) -> WorkerResult<Finished> {
        let root: Value = serde_json::from_str(json)
            .map_err(|e| rzt_backup::BackupError::Parse(e.to_string()))?;

        // Current-format payloads must carry a valid stamp; older ones have
        // none and go straight to the importer.
        if payload_version(&root) >= u64::from(CURRENT_VERSION) {
            let verification = IntegrityVerifier::verify_value(None, &root);
            if let Some(reason) = verification.failure().map(ToString::to_string) {
                return Err(WorkerError::Verification(reason));
            }
        }

        let mut engine = ImportEngine::new(self.store.as_ref());
        if let Some(images) = self.images.as_deref() {
            engine = engine.with_images(images);
        }
        let result = engine.import_exact(json)?;
        tracing::debug!(size = json.len(), issues = result.issues.len(), "imported backup json");
        Ok(Finished::Imported(result))
    }
}

/// Successful outcome before timing is attached.
enum Finished {
    Built(String),
    Imported(rzt_backup::ImportResult),
}

impl Finished {
    fn finish(self, ms: f64) -> WorkerResponse {
        match self {
            Self::Built(json) => WorkerResponse::built(json, ms),
            Self::Imported(result) => WorkerResponse::imported(&result, ms),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".to_string()
    }
}

/// Handle to a running worker thread.
///
/// Mirrors a message port: [`post_message`](Self::post_message) sends a
/// loosely typed message, [`recv`](Self::recv) waits for the next result.
/// The protocol carries no request ids; callers keep at most one request
/// outstanding (see [`BackupClient`](crate::BackupClient)).
pub struct WorkerBridge {
    requests: mpsc::Sender<Value>,
    responses: async_mpsc::UnboundedReceiver<WorkerResponse>,
    handle: thread::JoinHandle<()>,
}

impl WorkerBridge {
    /// Start a worker thread over `store` (and optionally `images`).
    pub fn spawn(
        store: Arc<dyn CatalogStore>,
        images: Option<Arc<dyn ImageStore>>,
    ) -> WorkerResult<Self> {
        let (request_tx, request_rx) = mpsc::channel::<Value>();
        let (response_tx, response_rx) = async_mpsc::unbounded_channel();
        let context = WorkerContext { store, images };

        let handle = thread::Builder::new()
            .name("rzt-backup-worker".into())
            .spawn(move || {
                while let Ok(message) = request_rx.recv() {
                    let Some(request) = WorkerRequest::from_message(&message) else {
                        tracing::debug!("ignoring unrecognized worker message");
                        continue;
                    };
                    let response = context.handle(&request);
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
                tracing::debug!("worker thread exiting");
            })?;

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            handle,
        })
    }

    /// Post a raw message. Unrecognized messages are dropped by the worker.
    pub fn post_message(&self, message: Value) -> WorkerResult<()> {
        self.requests
            .send(message)
            .map_err(|_| WorkerError::Disconnected)
    }

    pub fn post(&self, request: &WorkerRequest) -> WorkerResult<()> {
        self.post_message(request.to_message())
    }

    /// Wait for the next result message. Cancel-safe.
    pub async fn recv(&mut self) -> WorkerResult<WorkerResponse> {
        self.responses.recv().await.ok_or(WorkerError::Disconnected)
    }

    /// Next result if one is already waiting.
    pub fn try_recv(&mut self) -> Option<WorkerResponse> {
        self.responses.try_recv().ok()
    }

    /// Close the request channel and wait for the current operation to end.
    pub fn shutdown(self) {
        let Self {
            requests, handle, ..
        } = self;
        drop(requests);
        if handle.join().is_err() {
            tracing::error!("worker thread terminated abnormally");
        }
    }
}

impl std::fmt::Debug for WorkerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerBridge")
            .field("thread", &self.handle.thread().name())
            .finish()
    }
}
