use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::typing::{ActiveTypistsResponse, TypingResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn ping(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let indicator = state.typing_service.ping(conversation_id, auth_user.user_id).await?;
    Ok(Json(TypingResponse::from(indicator)))
}

/// # Errors
/// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
pub async fn active_typists(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user_ids = state.typing_service.active_typists(conversation_id, auth_user.user_id).await?;
    Ok(Json(ActiveTypistsResponse { user_ids }))
}
