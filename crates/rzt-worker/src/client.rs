use std::sync::Arc;
use std::time::Duration;

use rzt_store::{CatalogStore, ImageStore};
use rzt_types::KindCounts;

use crate::bridge::WorkerBridge;
use crate::error::{WorkerError, WorkerResult};
use crate::protocol::{ResultMessage, WorkerRequest, WorkerResponse};

/// A finished build.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildOutput {
    pub json: String,
    pub ms: Option<f64>,
}

/// A finished import.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportOutput {
    pub inserted: KindCounts,
    pub updated: KindCounts,
    pub issues: Vec<String>,
    pub ms: Option<f64>,
}

/// Caller side of the worker protocol.
///
/// Every call takes `&mut self`, so at most one request is outstanding. When
/// a call times out the worker keeps going; its late result is discarded
/// before the next request is posted. The timeout bounds the whole call,
/// including that discard, so a call made while an abandoned operation is
/// still running times out without posting anything.
#[derive(Debug)]
pub struct BackupClient {
    bridge: WorkerBridge,
    timeout: Option<Duration>,
    /// Results the worker still owes, including abandoned ones.
    owed: usize,
}

impl BackupClient {
    pub fn new(bridge: WorkerBridge) -> Self {
        Self {
            bridge,
            timeout: None,
            owed: 0,
        }
    }

    /// Spawn a worker over `store` and wrap it.
    pub fn spawn(
        store: Arc<dyn CatalogStore>,
        images: Option<Arc<dyn ImageStore>>,
    ) -> WorkerResult<Self> {
        Ok(Self::new(WorkerBridge::spawn(store, images)?))
    }

    /// Give up waiting after `timeout`. The operation itself is not cancelled.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a full export on the worker.
    pub async fn build(&mut self) -> WorkerResult<BuildOutput> {
        let result = self.call(&WorkerRequest::Build).await?;
        Ok(BuildOutput {
            json: result.json.ok_or(WorkerError::IncompleteResult("json"))?,
            ms: result.ms,
        })
    }

    /// Verify and import `json` on the worker.
    pub async fn import(&mut self, json: String) -> WorkerResult<ImportOutput> {
        let result = self.call(&WorkerRequest::Import { json }).await?;
        Ok(ImportOutput {
            inserted: result.inserted.ok_or(WorkerError::IncompleteResult("inserted"))?,
            updated: result.updated.unwrap_or_default(),
            issues: result.issues.unwrap_or_default(),
            ms: result.ms,
        })
    }

    pub fn shutdown(self) {
        self.bridge.shutdown();
    }

    async fn call(&mut self, request: &WorkerRequest) -> WorkerResult<ResultMessage> {
        let response = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.exchange(request)).await {
                Ok(response) => response?,
                Err(_) => {
                    tracing::warn!(
                        op = request.type_name(),
                        ?limit,
                        owed = self.owed,
                        "worker result overdue"
                    );
                    return Err(WorkerError::Timeout(limit));
                }
            },
            None => self.exchange(request).await?,
        };

        let result = response.into_result();
        if result.ok {
            Ok(result)
        } else {
            Err(WorkerError::Failed(
                result.error.unwrap_or_else(|| "worker error".to_string()),
            ))
        }
    }

    /// Drain results owed to abandoned requests, then post `request` and
    /// wait for its answer. Dropping this future at any await leaves `owed`
    /// matching what the worker will still send.
    async fn exchange(&mut self, request: &WorkerRequest) -> WorkerResult<WorkerResponse> {
        while self.owed > 0 {
            let stale = self.bridge.recv().await?;
            self.owed -= 1;
            tracing::debug!(ok = stale.result().ok, "discarding result of abandoned request");
        }

        self.bridge.post(request)?;
        self.owed += 1;
        let response = self.bridge.recv().await?;
        self.owed -= 1;
        Ok(response)
    }
}
