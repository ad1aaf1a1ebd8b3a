use crate::adapters::store::TypingStore;
use crate::domain::clock::Clock;
use crate::domain::typing::TypingIndicator;
use crate::error::Result;
use crate::services::conversation_service::ConversationService;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use time::Duration;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    pings_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            pings_total: meter
                .u64_counter("chirp_typing_pings_total")
                .with_description("Total typing pings accepted")
                .build(),
        }
    }
}

/// Short-lived "is typing" presence. Liveness is always computed from
/// `expires_at` at read time.
#[derive(Clone, Debug)]
pub struct TypingService {
    conversations: ConversationService,
    store: Arc<dyn TypingStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    metrics: Metrics,
}

impl TypingService {
    #[must_use]
    pub fn new(
        conversations: ConversationService,
        store: Arc<dyn TypingStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self { conversations, store, clock, ttl, metrics: Metrics::new() }
    }

    /// Opens or extends the typing window of `user` to `now + ttl`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::NotAParticipant` if `user` is not in it.
    #[tracing::instrument(level = "debug", err(level = "warn"), skip(self))]
    pub async fn ping(&self, conversation_id: Uuid, user: Uuid) -> Result<TypingIndicator> {
        self.conversations.get(conversation_id, user).await?;
        let indicator = self.store.upsert(conversation_id, user, self.clock.now(), self.ttl).await?;
        self.metrics.pings_total.add(1, &[]);
        Ok(indicator)
    }

    /// Same as [`Self::ping`].
    ///
    /// # Errors
    /// Same as [`Self::ping`].
    pub async fn extend(&self, conversation_id: Uuid, user: Uuid) -> Result<TypingIndicator> {
        self.ping(conversation_id, user).await
    }

    /// # Errors
    /// Returns `AppError::Database` if storage fails.
    pub async fn is_active(&self, conversation_id: Uuid, user: Uuid) -> Result<bool> {
        let now = self.clock.now();
        Ok(self.store.find(conversation_id, user).await?.is_some_and(|t| t.is_active_at(now)))
    }

    /// Participants other than `viewer` whose typing window is open.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn active_typists(&self, conversation_id: Uuid, viewer: Uuid) -> Result<Vec<Uuid>> {
        self.conversations.get(conversation_id, viewer).await?;
        let now = self.clock.now();

        Ok(self
            .store
            .list_for_conversation(conversation_id)
            .await?
            .into_iter()
            .filter(|t| t.user_id != viewer && t.is_active_at(now))
            .map(|t| t.user_id)
            .collect())
    }

    /// Deletes rows whose window has closed. Never affects `is_active`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if storage fails.
    pub async fn reclaim_expired(&self) -> Result<u64> {
        self.store.delete_expired(self.clock.now()).await
    }
}
