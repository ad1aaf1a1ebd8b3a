use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::conversations::{
    BlockParticipantRequest, ConversationListResponse, ConversationResponse, ConversationSummaryResponse,
    CreateConversationRequest, ListConversationsQuery, UnreadCountResponse,
};
use crate::domain::conversation::Conversation;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

fn respond(conversation: &Conversation, viewer: Uuid) -> Result<Json<ConversationResponse>> {
    Ok(Json(ConversationResponse::for_viewer(conversation, viewer)?))
}

/// Starts a conversation with another user, or returns the existing one.
///
/// # Errors
/// Returns `AppError::InvalidParticipants` if the caller names themselves.
pub async fn create_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse> {
    let conversation = state.conversation_service.get_or_create(auth_user.user_id, payload.participant_id).await?;
    Ok((StatusCode::OK, respond(&conversation, auth_user.user_id)?))
}

/// # Errors
/// Returns `AppError::Database` if storage fails.
pub async fn list_conversations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListConversationsQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let summaries = state.conversation_service.list(auth_user.user_id, query.archived, limit).await?;

    let conversations = summaries
        .into_iter()
        .map(|s| ConversationSummaryResponse::for_viewer(s, auth_user.user_id))
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(ConversationListResponse { conversations }))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn get_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.conversation_service.summary(conversation_id, auth_user.user_id).await?;
    Ok(Json(ConversationSummaryResponse::for_viewer(summary, auth_user.user_id)?))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn archive(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state.conversation_service.archive(conversation_id, auth_user.user_id).await?;
    respond(&conversation, auth_user.user_id)
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn unarchive(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state.conversation_service.unarchive(conversation_id, auth_user.user_id).await?;
    respond(&conversation, auth_user.user_id)
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn mute(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state.conversation_service.mute(conversation_id, auth_user.user_id).await?;
    respond(&conversation, auth_user.user_id)
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn unmute(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state.conversation_service.unmute(conversation_id, auth_user.user_id).await?;
    respond(&conversation, auth_user.user_id)
}

/// Blocks the other participant from sending in this conversation.
///
/// # Errors
/// Returns `AppError::InvalidParticipants` if `userId` is not the other participant.
pub async fn block(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<BlockParticipantRequest>,
) -> Result<impl IntoResponse> {
    let conversation =
        state.conversation_service.block(conversation_id, auth_user.user_id, payload.user_id).await?;
    respond(&conversation, auth_user.user_id)
}

/// # Errors
/// Returns `AppError::InvalidParticipants` if `userId` is not the other participant.
pub async fn unblock(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<BlockParticipantRequest>,
) -> Result<impl IntoResponse> {
    let conversation =
        state.conversation_service.unblock(conversation_id, auth_user.user_id, payload.user_id).await?;
    respond(&conversation, auth_user.user_id)
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn unread_count(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let unread_count = state.conversation_service.unread_count(conversation_id, auth_user.user_id).await?;
    Ok(Json(UnreadCountResponse { conversation_id, unread_count }))
}
