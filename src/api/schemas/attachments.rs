use crate::domain::attachment::{AttachmentCandidate, FileCategory, MessageAttachment};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: Option<FileCategory>,
    pub thumbnail_ref: Option<String>,
}

impl From<AttachRequest> for AttachmentCandidate {
    fn from(req: AttachRequest) -> Self {
        Self {
            file_name: req.file_name,
            file_size: req.file_size,
            file_type: req.file_type,
            thumbnail_ref: req.thumbnail_ref,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub message_id: Uuid,
    pub file_type: FileCategory,
    pub file_size: u64,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub thumbnail_ref: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<MessageAttachment> for AttachmentResponse {
    fn from(a: MessageAttachment) -> Self {
        Self {
            id: a.id,
            message_id: a.message_id,
            file_type: a.file_type,
            file_size: a.file_size,
            file_name: a.file_name,
            mime_type: a.mime_type,
            thumbnail_ref: a.thumbnail_ref,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentListResponse {
    pub attachments: Vec<AttachmentResponse>,
}
