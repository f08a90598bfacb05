//! Publishing payloads to a content-addressed store.
//!
//! [`Publisher`] wraps a [`ContentStore`] with bounded retries and
//! exponential backoff. [`Publisher::publish`] fails once retries are
//! exhausted; [`Publisher::publish_all`] records the failure and keeps going,
//! uploading at most `concurrency` items at a time.
//!
//! # Example
//!
//! ```no_run
//! use pdfveil::publish::{MemoryStore, Payload, Publisher, UploadItem};
//! use std::sync::Arc;
//!
//! # async fn run() -> pdfveil::Result<()> {
//! let publisher = Publisher::new(Arc::new(MemoryStore::new()));
//!
//! let id = publisher
//!     .publish(&Payload::json(serde_json::json!(["a", "b"])), "manifest.json", 2)
//!     .await?;
//! println!("manifest: {}", id);
//!
//! let items = vec![
//!     UploadItem::bytes("page-1.png", vec![1, 2, 3]),
//!     UploadItem::bytes("page-2.png", vec![4, 5, 6]),
//! ];
//! for result in publisher.publish_all(&items, 5, 2).await {
//!     println!("{:?}", result);
//! }
//! # Ok(())
//! # }
//! ```

mod memory;
#[cfg(feature = "pinata")]
mod pinata;
mod retry;

pub use memory::MemoryStore;
#[cfg(feature = "pinata")]
pub use pinata::PinataStore;
pub use retry::{retry_with_backoff, RetryPolicy, Sleeper, TokioSleeper, BASE_DELAY};

use crate::error::Result;
use crate::model::ContentId;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A content-addressed store.
///
/// Both operations must be safe to repeat: a retried call may at worst leave
/// an unreferenced object behind.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store raw bytes under a display name.
    async fn put_bytes(&self, payload: &[u8], name: &str) -> Result<ContentId>;

    /// Store a JSON value, optionally named.
    async fn put_json(&self, value: &serde_json::Value, name: Option<&str>) -> Result<ContentId>;
}

/// Something to upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes (page image, encrypted document)
    Bytes(Vec<u8>),
    /// JSON document (manifest)
    Json(serde_json::Value),
}

impl Payload {
    /// Raw byte payload.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Payload::Bytes(data.into())
    }

    /// JSON payload.
    pub fn json(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// A named payload in a batch upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    /// Name shown in the store and used to report failures
    pub name: String,
    /// Content to upload
    pub payload: Payload,
}

impl UploadItem {
    /// Create an upload item.
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Byte upload item.
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, Payload::bytes(data))
    }
}

/// Outcome of one item in a batch upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// The item was stored
    Published {
        /// Id assigned by the store
        content_id: ContentId,
    },
    /// Every attempt failed
    Failed {
        /// Name of the item that failed
        source_ref: String,
        /// Final error message
        error: String,
    },
}

impl UploadResult {
    /// The content id, if the upload succeeded.
    pub fn content_id(&self) -> Option<&ContentId> {
        match self {
            UploadResult::Published { content_id } => Some(content_id),
            UploadResult::Failed { .. } => None,
        }
    }

    /// Whether the upload succeeded.
    pub fn is_published(&self) -> bool {
        matches!(self, UploadResult::Published { .. })
    }
}

/// Uploads payloads with retries and bounded concurrency.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ContentStore>,
    sleeper: Arc<dyn Sleeper>,
    base_delay: Duration,
}

impl Publisher {
    /// Publisher sleeping on the tokio timer with the default 1s base delay.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            sleeper: Arc::new(TokioSleeper),
            base_delay: BASE_DELAY,
        }
    }

    /// Replace the backoff sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the base backoff delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    fn policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_base_delay(self.base_delay)
    }

    async fn put_once(&self, payload: &Payload, name: &str) -> Result<ContentId> {
        match payload {
            Payload::Bytes(data) => self.store.put_bytes(data, name).await,
            Payload::Json(value) => self.store.put_json(value, Some(name)).await,
        }
    }

    /// Upload one payload, retrying up to `max_retries` more times.
    ///
    /// Fails with [`crate::Error::PublishExhausted`] when no attempt succeeds.
    pub async fn publish(
        &self,
        payload: &Payload,
        name: &str,
        max_retries: u32,
    ) -> Result<ContentId> {
        let policy = self.policy(max_retries);
        let id = retry_with_backoff(&policy, self.sleeper.as_ref(), name, |attempt| async move {
            log::debug!("Uploading {} (attempt {})", name, attempt + 1);
            let started = Instant::now();
            let id = self.put_once(payload, name).await?;
            log::debug!("Uploading {} took {}ms", name, started.elapsed().as_millis());
            Ok::<_, crate::Error>(id)
        })
        .await?;

        log::info!("Published {} as {}", name, id);
        Ok(id)
    }

    /// Upload `items` in windows of `concurrency`, each window finishing
    /// before the next starts.
    ///
    /// Results follow input order. A failed item never aborts its siblings.
    pub async fn publish_all(
        &self,
        items: &[UploadItem],
        concurrency: usize,
        max_retries: u32,
    ) -> Vec<UploadResult> {
        let mut results = Vec::with_capacity(items.len());

        for window in items.chunks(concurrency.max(1)) {
            log::debug!("Uploading batch of {} items", window.len());
            let uploads = window.iter().map(|item| async move {
                match self.publish(&item.payload, &item.name, max_retries).await {
                    Ok(content_id) => UploadResult::Published { content_id },
                    Err(err) => UploadResult::Failed {
                        source_ref: item.name.clone(),
                        error: err.to_string(),
                    },
                }
            });
            results.extend(join_all(uploads).await);
        }

        results
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}
