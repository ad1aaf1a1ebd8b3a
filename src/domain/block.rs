use time::OffsetDateTime;
use uuid::Uuid;

/// A global, directional block declared independently of any conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedUser {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub blocked_at: OffsetDateTime,
}
