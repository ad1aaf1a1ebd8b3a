use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::messages::{
    EditMessageRequest, MarkConversationReadResponse, MessageResponse, ReceiptListResponse, SendMessageRequest,
    TimelineQuery, TimelineResponse,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Sends a message into a conversation the caller participates in.
///
/// # Errors
/// Returns `AppError::SenderBlocked` if the recipient blocked the caller.
/// Returns `AppError::ContentTooLong` or `AppError::BadRequest` for invalid content.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.send(conversation_id, auth_user.user_id, payload.content).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Sends a message to a user, creating the conversation on first contact.
///
/// # Errors
/// Returns `AppError::InvalidParticipants` if the caller targets themselves.
pub async fn send_to_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(recipient_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.send_to_user(auth_user.user_id, recipient_id, payload.content).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// # Errors
/// Returns `AppError::BadRequest` if `before` is not a message of this conversation.
pub async fn timeline(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse> {
    let page = state.message_service.timeline(conversation_id, auth_user.user_id, query.before, query.limit).await?;
    Ok(Json(TimelineResponse {
        messages: page.messages.into_iter().map(MessageResponse::from).collect(),
        next_before: page.next_before,
    }))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn mark_conversation_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let marked_read = state.message_service.mark_conversation_read(conversation_id, auth_user.user_id).await?;
    Ok(Json(MarkConversationReadResponse { marked_read }))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn mark_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.mark_read(message_id, auth_user.user_id).await?;
    Ok(Json(MessageResponse::from(message)))
}

/// # Errors
/// Returns `AppError::Unauthorized` if the caller did not send the message.
/// Returns `AppError::AlreadyDeleted` if it was deleted.
pub async fn edit_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(payload): Json<EditMessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.edit(message_id, auth_user.user_id, payload.content).await?;
    Ok(Json(MessageResponse::from(message)))
}

/// # Errors
/// Returns `AppError::Unauthorized` if the caller did not send the message.
pub async fn delete_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.soft_delete(message_id, auth_user.user_id).await?;
    Ok(Json(MessageResponse::from(message)))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn receipts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let receipts = state.message_service.receipts(message_id, auth_user.user_id).await?;
    Ok(Json(ReceiptListResponse { receipts: receipts.into_iter().map(Into::into).collect() }))
}
