use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmEvent {
    MessageReceived { conversation_id: Uuid, message_id: Uuid },
    MessageRead { conversation_id: Uuid, message_id: Uuid },
}
