use crate::domain::block::BlockedUser;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedUserResponse {
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub blocked_at: OffsetDateTime,
}

impl From<BlockedUser> for BlockedUserResponse {
    fn from(block: BlockedUser) -> Self {
        Self { user_id: block.blocked_id, blocked_at: block.blocked_at }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockListResponse {
    pub blocked: Vec<BlockedUserResponse>,
}
