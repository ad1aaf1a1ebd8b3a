use crate::domain::message::Message;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) seq: i64,
    pub(crate) conversation_id: Uuid,
    pub(crate) sender_id: Uuid,
    pub(crate) content: String,
    pub(crate) is_read: bool,
    pub(crate) read_at: Option<OffsetDateTime>,
    pub(crate) is_edited: bool,
    pub(crate) edited_at: Option<OffsetDateTime>,
    pub(crate) is_deleted: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            seq: record.seq,
            conversation_id: record.conversation_id,
            sender_id: record.sender_id,
            content: record.content,
            is_read: record.is_read,
            read_at: record.read_at,
            is_edited: record.is_edited,
            edited_at: record.edited_at,
            is_deleted: record.is_deleted,
            created_at: record.created_at,
        }
    }
}
