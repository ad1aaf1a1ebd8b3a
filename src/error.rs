use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Authentication failed")]
    AuthError,
    #[error("A conversation requires two distinct participants")]
    InvalidParticipants,
    #[error("User is not a participant of this conversation")]
    NotAParticipant,
    #[error("Sender is blocked by the recipient")]
    SenderBlocked,
    #[error("Only the sender may modify this message")]
    Unauthorized,
    #[error("Message has been deleted")]
    AlreadyDeleted,
    #[error("Message content exceeds {max} characters")]
    ContentTooLong { max: usize },
    #[error("Attachment rejected: {0}")]
    AttachmentRejected(String),
    #[error("Not found")]
    NotFound,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            Self::AuthError => {
                tracing::debug!("Authentication failed");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::SenderBlocked | Self::Unauthorized | Self::NotAParticipant => {
                tracing::debug!(reason = %self, "Permission denied");
                (StatusCode::FORBIDDEN, self.to_string())
            }
            Self::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Self::AlreadyDeleted => {
                tracing::debug!("Modification of deleted message");
                (StatusCode::CONFLICT, self.to_string())
            }
            Self::InvalidParticipants | Self::ContentTooLong { .. } | Self::AttachmentRejected(_) => {
                tracing::debug!(reason = %self, "Validation failed");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
