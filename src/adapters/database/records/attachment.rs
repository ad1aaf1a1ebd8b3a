use crate::domain::attachment::{FileCategory, MessageAttachment};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct AttachmentRecord {
    pub(crate) id: Uuid,
    pub(crate) message_id: Uuid,
    pub(crate) file_type: String,
    pub(crate) file_size: i64,
    pub(crate) file_name: String,
    pub(crate) mime_type: Option<String>,
    pub(crate) thumbnail_ref: Option<String>,
    pub(crate) created_at: OffsetDateTime,
}

impl From<AttachmentRecord> for MessageAttachment {
    fn from(record: AttachmentRecord) -> Self {
        Self {
            id: record.id,
            message_id: record.message_id,
            file_type: FileCategory::parse(&record.file_type).unwrap_or(FileCategory::Other),
            file_size: u64::try_from(record.file_size).unwrap_or_default(),
            file_name: record.file_name,
            mime_type: record.mime_type,
            thumbnail_ref: record.thumbnail_ref,
            created_at: record.created_at,
        }
    }
}
