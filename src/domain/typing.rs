use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Typing presence for one user in one conversation.
///
/// Liveness is derived from `expires_at` at read time; expired rows are
/// logically inactive whether or not they have been reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingIndicator {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub started_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl TypingIndicator {
    #[must_use]
    pub fn start(conversation_id: Uuid, user_id: Uuid, now: OffsetDateTime, ttl: Duration) -> Self {
        Self { conversation_id, user_id, started_at: now, expires_at: now + ttl }
    }

    #[must_use]
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }

    /// Re-issues the window from `now`. A lapsed indicator starts a new
    /// typing session; a live one keeps its original `started_at`.
    pub fn refresh(&mut self, now: OffsetDateTime, ttl: Duration) {
        if !self.is_active_at(now) {
            self.started_at = now;
        }
        self.expires_at = now + ttl;
    }
}
