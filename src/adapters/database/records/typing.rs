use crate::domain::typing::TypingIndicator;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct TypingIndicatorRecord {
    pub(crate) conversation_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) started_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
}

impl From<TypingIndicatorRecord> for TypingIndicator {
    fn from(record: TypingIndicatorRecord) -> Self {
        Self {
            conversation_id: record.conversation_id,
            user_id: record.user_id,
            started_at: record.started_at,
            expires_at: record.expires_at,
        }
    }
}
