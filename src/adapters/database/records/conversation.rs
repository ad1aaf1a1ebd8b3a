use crate::domain::conversation::{Conversation, ParticipantPair, ParticipantState};
use crate::error::{AppError, Result};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ConversationRecord {
    pub(crate) id: Uuid,
    pub(crate) participant_1: Uuid,
    pub(crate) participant_2: Uuid,
    pub(crate) archived_by_p1: bool,
    pub(crate) archived_by_p2: bool,
    pub(crate) muted_by_p1: bool,
    pub(crate) muted_by_p2: bool,
    pub(crate) p1_blocked_p2: bool,
    pub(crate) p2_blocked_p1: bool,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl TryFrom<ConversationRecord> for Conversation {
    type Error = AppError;

    fn try_from(record: ConversationRecord) -> Result<Self> {
        let participants = ParticipantPair::new(record.participant_1, record.participant_2)?;
        if participants.first() != record.participant_1 {
            tracing::error!(conversation_id = %record.id, "Stored conversation is not in canonical order");
            return Err(AppError::Internal);
        }

        Ok(Self {
            id: record.id,
            participants,
            states: [
                ParticipantState {
                    archived: record.archived_by_p1,
                    muted: record.muted_by_p1,
                    blocked_other: record.p1_blocked_p2,
                },
                ParticipantState {
                    archived: record.archived_by_p2,
                    muted: record.muted_by_p2,
                    blocked_other: record.p2_blocked_p1,
                },
            ],
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
