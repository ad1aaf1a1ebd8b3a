use crate::domain::block::BlockedUser;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct BlockedUserRecord {
    pub(crate) blocker_id: Uuid,
    pub(crate) blocked_id: Uuid,
    pub(crate) blocked_at: OffsetDateTime,
}

impl From<BlockedUserRecord> for BlockedUser {
    fn from(record: BlockedUserRecord) -> Self {
        Self { blocker_id: record.blocker_id, blocked_id: record.blocked_id, blocked_at: record.blocked_at }
    }
}
