use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::blocks::{BlockListResponse, BlockedUserResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// # Errors
/// Returns `AppError::Database` if storage fails.
pub async fn list_blocks(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let blocked = state.block_service.list(auth_user.user_id).await?;
    Ok(Json(BlockListResponse { blocked: blocked.into_iter().map(Into::into).collect() }))
}

/// # Errors
/// Returns `AppError::InvalidParticipants` if the caller blocks themselves.
pub async fn block_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let record = state.block_service.block(auth_user.user_id, user_id).await?;
    Ok(Json(BlockedUserResponse::from(record)))
}

/// # Errors
/// Returns `AppError::Database` if storage fails.
pub async fn unblock_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.block_service.unblock(auth_user.user_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
