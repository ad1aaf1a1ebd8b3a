use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::attachments::{AttachRequest, AttachmentListResponse, AttachmentResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Validates attachment metadata and records it against a message.
///
/// # Errors
/// Returns `AppError::AttachmentRejected` if the metadata fails validation.
/// Returns `AppError::Unauthorized` if the caller did not send the message.
pub async fn attach(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(payload): Json<AttachRequest>,
) -> Result<impl IntoResponse> {
    let attachment = state.attachment_service.attach(message_id, auth_user.user_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(AttachmentResponse::from(attachment))))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn list_attachments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attachments = state.attachment_service.list(message_id, auth_user.user_id).await?;
    Ok(Json(AttachmentListResponse { attachments: attachments.into_iter().map(Into::into).collect() }))
}
