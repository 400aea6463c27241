//! Background sync: replay of form submissions that failed while offline.
//!
//! Where pending submissions live is up to the embedding application; the
//! router only needs the `PendingQueue` contract (list, remove, push).

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    error::AppError,
    metrics,
    origin::{FetchRequest, Origin},
};

pub const FORM_SYNC_TAG: &str = "background-sync-forms";

/// A request captured while offline, waiting to be replayed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequest {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Origin-relative URL, e.g. `/api/sales/`
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Raw body, base64 encoded on the wire
    #[serde(default, with = "base64_body")]
    pub body: Vec<u8>,
    #[serde(default = "Utc::now")]
    pub queued_at: DateTime<Utc>,
}

fn default_method() -> String {
    "POST".to_string()
}

mod base64_body {
    use super::*;

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

impl PendingRequest {
    /// Reject entries that could never be replayed
    pub fn validate(&self) -> Result<(), AppError> {
        self.to_fetch_request().map(|_| ())
    }

    fn to_fetch_request(&self) -> Result<FetchRequest, AppError> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| AppError::InvalidInput(format!("invalid method '{}': {}", self.method, e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::InvalidInput(format!("invalid header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::InvalidInput(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut request = FetchRequest::new(method, self.url.clone()).with_body(self.body.clone());
        request.headers = headers;
        Ok(request)
    }
}

/// Storage for pending requests
#[async_trait]
pub trait PendingQueue: Send + Sync {
    /// Pending entries, oldest first
    async fn pending(&self) -> Result<Vec<PendingRequest>, AppError>;

    async fn remove(&self, id: Uuid) -> Result<(), AppError>;

    async fn push(&self, request: PendingRequest) -> Result<(), AppError>;
}

/// Process-local queue
#[derive(Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<PendingRequest>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingQueue for MemoryQueue {
    async fn pending(&self) -> Result<Vec<PendingRequest>, AppError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.entries.lock().await.retain(|entry| entry.id != id);
        Ok(())
    }

    async fn push(&self, request: PendingRequest) -> Result<(), AppError> {
        self.entries.lock().await.push(request);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub tag: String,
    /// False when the tag is not one this worker handles
    pub handled: bool,
    pub synced: Vec<Uuid>,
    /// Still queued, retried on the next sync event
    pub failed: Vec<SyncFailure>,
    /// Removed without replay because the stored request is malformed
    pub dropped: Vec<SyncFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub id: Uuid,
    pub error: String,
}

pub struct BackgroundSync {
    tag: String,
    queue: Arc<dyn PendingQueue>,
}

impl BackgroundSync {
    pub fn new(tag: impl Into<String>, queue: Arc<dyn PendingQueue>) -> Self {
        Self {
            tag: tag.into(),
            queue,
        }
    }

    pub fn queue(&self) -> &Arc<dyn PendingQueue> {
        &self.queue
    }

    /// Handle a sync event.
    ///
    /// Each entry is replayed independently. Any HTTP answer from the origin
    /// counts as delivered and removes the entry; network failures leave it
    /// queued for the next sync event. Entries that cannot be turned into a
    /// request are dropped.
    pub async fn handle_sync(&self, tag: &str, origin: &dyn Origin) -> SyncReport {
        info!(tag = %tag, "Background sync");

        let mut report = SyncReport {
            tag: tag.to_string(),
            ..Default::default()
        };

        if tag != self.tag {
            debug!(tag = %tag, "Ignoring unknown sync tag");
            return report;
        }
        report.handled = true;

        let pending = match self.queue.pending().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Background sync failed");
                return report;
            }
        };

        for entry in pending {
            let request = match entry.to_fetch_request() {
                Ok(request) => request,
                Err(e) => {
                    error!(id = %entry.id, error = %e, "Dropping malformed offline form");
                    metrics::record_sync_replay("dropped");
                    if let Err(remove_error) = self.queue.remove(entry.id).await {
                        error!(id = %entry.id, error = %remove_error, "Failed to drop offline form");
                    }
                    report.dropped.push(SyncFailure {
                        id: entry.id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match self.replay(&entry, &request, origin).await {
                Ok(()) => {
                    info!(id = %entry.id, "Synced offline form");
                    metrics::record_sync_replay("synced");
                    report.synced.push(entry.id);
                }
                Err(e) => {
                    error!(id = %entry.id, error = %e, "Failed to sync form");
                    metrics::record_sync_replay("failed");
                    report.failed.push(SyncFailure {
                        id: entry.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn replay(
        &self,
        entry: &PendingRequest,
        request: &FetchRequest,
        origin: &dyn Origin,
    ) -> Result<(), AppError> {
        origin.fetch(request).await?;
        self.queue.remove(entry.id).await
    }
}
