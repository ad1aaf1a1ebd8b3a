use crate::adapters::store::BlockStore;
use crate::domain::block::BlockedUser;
use crate::domain::clock::Clock;
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    changes_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            changes_total: meter
                .u64_counter("chirp_global_block_changes_total")
                .with_description("Global block list changes by action")
                .build(),
        }
    }
}

/// The conversation-independent block list.
#[derive(Clone, Debug)]
pub struct BlockService {
    store: Arc<dyn BlockStore>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl BlockService {
    #[must_use]
    pub fn new(store: Arc<dyn BlockStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, metrics: Metrics::new() }
    }

    /// Stops `blocked` from sending to `blocker` in any conversation. Idempotent.
    ///
    /// # Errors
    /// Returns `AppError::InvalidParticipants` if a user tries to block themselves.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn block(&self, blocker: Uuid, blocked: Uuid) -> Result<BlockedUser> {
        if blocker == blocked {
            return Err(AppError::InvalidParticipants);
        }
        let record = self.store.insert(blocker, blocked, self.clock.now()).await?;
        self.metrics.changes_total.add(1, &[KeyValue::new("action", "block")]);
        Ok(record)
    }

    /// Idempotent; unblocking someone who was never blocked succeeds.
    ///
    /// # Errors
    /// Returns `AppError::Database` if storage fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn unblock(&self, blocker: Uuid, blocked: Uuid) -> Result<()> {
        if self.store.delete(blocker, blocked).await? {
            self.metrics.changes_total.add(1, &[KeyValue::new("action", "unblock")]);
        }
        Ok(())
    }

    /// # Errors
    /// Returns `AppError::Database` if storage fails.
    pub async fn is_blocked(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        self.store.exists(blocker, blocked).await
    }

    /// # Errors
    /// Returns `AppError::Database` if storage fails.
    pub async fn list(&self, blocker: Uuid) -> Result<Vec<BlockedUser>> {
        self.store.list_for_blocker(blocker).await
    }
}
