use crate::domain::receipt::ReadReceipt;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ReadReceiptRecord {
    pub(crate) message_id: Uuid,
    pub(crate) reader_id: Uuid,
    pub(crate) read_at: OffsetDateTime,
}

impl From<ReadReceiptRecord> for ReadReceipt {
    fn from(record: ReadReceiptRecord) -> Self {
        Self { message_id: record.message_id, reader_id: record.reader_id, read_at: record.read_at }
    }
}
