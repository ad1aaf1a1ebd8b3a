use crate::domain::typing::TypingIndicator;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingResponse {
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<TypingIndicator> for TypingResponse {
    fn from(indicator: TypingIndicator) -> Self {
        Self { user_id: indicator.user_id, started_at: indicator.started_at, expires_at: indicator.expires_at }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTypistsResponse {
    pub user_ids: Vec<Uuid>,
}
