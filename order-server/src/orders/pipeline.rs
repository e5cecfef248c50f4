//! Ingestion pipeline
//!
//! Drives the durable subscription. Every message goes through
//!
//! ```text
//! Received ──validate──▶ Validated ──save──▶ Persisted ──set──▶ Cached ──▶ Acknowledged
//!    │                       │
//!    └──────────────▶ Rejected ◀┘
//! ```
//!
//! - A payload that fails validation is dropped; it never reaches the store
//!   or the cache.
//! - A store failure is dropped without touching the cache, so the cache never
//!   holds an order that is not durable.
//! - `Inserted` and `AlreadyPresent` are both success and the cache is always
//!   updated afterwards.
//! - The message is acknowledged only once it reached a terminal state. A crash
//!   before that means redelivery on restart, which is harmless because both
//!   writes are idempotent.

use std::sync::Arc;

use shared::order::{ValidationError, validate};
use tokio_util::sync::CancellationToken;

use super::cache::OrderCache;
use super::storage::{OrderStore, SaveOutcome, StorageError};
use crate::message::{Delivery, Subscription};

/// Back-off after a failed journal read
const READ_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Why a message was dropped
#[derive(Debug, thiserror::Error)]
pub enum RejectReason {
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationError),

    #[error("store failed: {0}")]
    Store(#[from] StorageError),
}

/// Terminal state of a single message
#[derive(Debug)]
pub enum IngestOutcome {
    /// Persisted (or already present) and cached
    Cached { order_uid: String, write: SaveOutcome },
    /// Dropped
    Rejected(RejectReason),
}

impl IngestOutcome {
    pub fn is_cached(&self) -> bool {
        matches!(self, IngestOutcome::Cached { .. })
    }
}

/// Validate → persist → cache
#[derive(Clone)]
pub struct IngestPipeline {
    store: Arc<dyn OrderStore>,
    cache: Arc<OrderCache>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<OrderCache>) -> Self {
        Self { store, cache }
    }

    /// Process one payload up to its terminal state
    pub async fn process(&self, payload: &[u8]) -> IngestOutcome {
        let order = match validate(payload) {
            Ok(order) => Arc::new(order),
            Err(e) => return IngestOutcome::Rejected(e.into()),
        };

        // redb writes block on disk I/O; keep them off the async workers
        let store = self.store.clone();
        let to_save = order.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&to_save))
            .await
            .unwrap_or_else(|e| Err(StorageError::Task(e.to_string())));

        let write = match saved {
            Ok(write) => write,
            Err(e) => return IngestOutcome::Rejected(e.into()),
        };

        let order_uid = order.order_uid.clone();
        self.cache.set(order_uid.clone(), order);

        IngestOutcome::Cached { order_uid, write }
    }

    /// Handle a delivery and log its outcome
    async fn handle(&self, delivery: &Delivery) -> IngestOutcome {
        let outcome = self.process(&delivery.payload).await;

        match &outcome {
            IngestOutcome::Cached { order_uid, write } => {
                tracing::info!(
                    target: "ingest",
                    sequence = delivery.sequence,
                    order_uid = %order_uid,
                    inserted = write.is_inserted(),
                    "Order processed"
                );
            }
            IngestOutcome::Rejected(RejectReason::Invalid(e)) => {
                tracing::warn!(
                    target: "ingest",
                    sequence = delivery.sequence,
                    error = %e,
                    "Dropping invalid message"
                );
            }
            IngestOutcome::Rejected(RejectReason::Store(e)) => {
                tracing::error!(
                    target: "ingest",
                    sequence = delivery.sequence,
                    error = %e,
                    "Dropping message after store failure"
                );
            }
        }

        outcome
    }

    /// Consume the subscription until shutdown
    ///
    /// This is a long-running task that should be spawned in the background.
    /// Each message is acknowledged after it reached a terminal state.
    pub async fn run(self, mut subscription: Subscription, shutdown_token: CancellationToken) {
        tracing::info!(
            target: "ingest",
            channel = subscription.channel(),
            durable_name = subscription.durable_name(),
            "🎯 Ingestion pipeline started"
        );

        loop {
            let delivery = tokio::select! {
                _ = shutdown_token.cancelled() => {
                    tracing::info!(target: "ingest", "Ingestion pipeline shutting down");
                    break;
                }
                next = subscription.next() => match next {
                    Ok(Some(delivery)) => delivery,
                    Ok(None) => {
                        tracing::info!(target: "ingest", "Subscription closed");
                        break;
                    }
                    Err(e) => {
                        // Journal read failures are not tied to one message
                        tracing::error!(target: "ingest", error = %e, "Failed to read from subscription");
                        if wait_before_retry(&shutdown_token).await {
                            continue;
                        }
                        tracing::info!(target: "ingest", "Ingestion pipeline shutting down");
                        break;
                    }
                },
            };

            self.handle(&delivery).await;

            if let Err(e) = subscription.ack(&delivery).await {
                tracing::error!(
                    target: "ingest",
                    sequence = delivery.sequence,
                    error = %e,
                    "Failed to acknowledge message, it will be redelivered after restart"
                );
            }
        }

        tracing::info!(target: "ingest", "Ingestion pipeline stopped");
    }
}

/// Sleep before retrying a failed read; `false` when shutdown fired first
async fn wait_before_retry(shutdown_token: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown_token.cancelled() => false,
        _ = tokio::time::sleep(READ_RETRY_DELAY) => true,
    }
}
