use crate::api::schemas::messages::MessageResponse;
use crate::domain::conversation::Conversation;
use crate::services::conversation_service::ConversationSummary;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub archived: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockParticipantRequest {
    pub user_id: Uuid,
}

/// A conversation from the caller's point of view. Only the caller's own
/// flags are exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: Uuid,
    pub other_participant_id: Uuid,
    pub archived: bool,
    pub muted: bool,
    pub blocked_other: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ConversationResponse {
    /// # Errors
    /// Returns `AppError::NotAParticipant` if `viewer` is not in the conversation.
    pub fn for_viewer(conversation: &Conversation, viewer: Uuid) -> crate::error::Result<Self> {
        let state = conversation.state_of(viewer)?;
        Ok(Self {
            id: conversation.id,
            other_participant_id: conversation.other_participant(viewer)?,
            archived: state.archived,
            muted: state.muted,
            blocked_other: state.blocked_other,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryResponse {
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
}

impl ConversationSummaryResponse {
    /// # Errors
    /// Returns `AppError::NotAParticipant` if `viewer` is not in the conversation.
    pub fn for_viewer(summary: ConversationSummary, viewer: Uuid) -> crate::error::Result<Self> {
        Ok(Self {
            conversation: ConversationResponse::for_viewer(&summary.conversation, viewer)?,
            last_message: summary.last_message.map(MessageResponse::from),
            unread_count: summary.unread_count,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummaryResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub conversation_id: Uuid,
    pub unread_count: i64,
}
