use time::OffsetDateTime;
use uuid::Uuid;

/// "`reader_id` read `message_id` at `read_at`". Unique per (message, reader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReceipt {
    pub message_id: Uuid,
    pub reader_id: Uuid,
    pub read_at: OffsetDateTime,
}
