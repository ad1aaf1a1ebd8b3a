//! Storage seams for the direct-messaging core.
//!
//! Every implementation must provide the same atomicity the services rely on:
//! insert-or-fetch for conversations and typing rows, and read-modify-write
//! under a row lock for message transitions.

use crate::domain::attachment::{MessageAttachment, ValidatedAttachment};
use crate::domain::block::BlockedUser;
use crate::domain::conversation::{Conversation, ParticipantPair, Slot, StateChange};
use crate::domain::message::{Message, NewMessage, ReadOutcome, TimelineCursor};
use crate::domain::receipt::ReadReceipt;
use crate::domain::typing::TypingIndicator;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// A state transition applied to a locked message row.
pub type MessageTransition<'a> = &'a (dyn Fn(&mut Message) -> Result<()> + Send + Sync);

#[async_trait]
pub trait ConversationStore: Send + Sync + fmt::Debug {
    /// Inserts a conversation for `pair`, or returns the one that already exists.
    /// `id` is only used when this call wins the insert.
    async fn get_or_create(&self, id: Uuid, pair: ParticipantPair, now: OffsetDateTime) -> Result<Conversation>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>>;

    async fn find_by_pair(&self, pair: ParticipantPair) -> Result<Option<Conversation>>;

    /// Assigns a single flag on a single slot.
    ///
    /// Returns `AppError::NotFound` if the conversation does not exist.
    async fn update_state(&self, id: Uuid, slot: Slot, change: StateChange, now: OffsetDateTime)
    -> Result<Conversation>;

    /// Conversations of `user` whose archive flag for `user` equals `archived`,
    /// most recently updated first.
    async fn list_for_user(&self, user: Uuid, archived: bool, limit: i64) -> Result<Vec<Conversation>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync + fmt::Debug {
    /// Persists a message and bumps the conversation's `updated_at`.
    ///
    /// Returns `AppError::NotFound` if the conversation does not exist.
    async fn insert(&self, message: NewMessage) -> Result<Message>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>>;

    /// Locks the message, applies `apply` and persists the result. Nothing is
    /// written when `apply` fails.
    async fn transition(&self, id: Uuid, apply: MessageTransition<'_>) -> Result<Message>;

    /// Performs the unread -> read transition (once) and records a receipt for
    /// `reader` (duplicates absorbed), atomically. Only the call that flipped
    /// the flag reports `transitioned`.
    async fn mark_read(&self, id: Uuid, reader: Uuid, now: OffsetDateTime) -> Result<ReadOutcome>;

    /// Marks every unread, non-deleted message from `sender` read for `reader`.
    /// Returns the number of messages that transitioned.
    async fn mark_all_read(
        &self,
        conversation_id: Uuid,
        sender: Uuid,
        reader: Uuid,
        now: OffsetDateTime,
    ) -> Result<u64>;

    /// Newest-first page strictly older than `before`.
    async fn page(&self, conversation_id: Uuid, before: Option<TimelineCursor>, limit: i64) -> Result<Vec<Message>>;

    async fn latest(&self, conversation_id: Uuid) -> Result<Option<Message>>;

    async fn count_unread(&self, conversation_id: Uuid, sender: Uuid) -> Result<i64>;

    async fn receipts(&self, message_id: Uuid) -> Result<Vec<ReadReceipt>>;
}

#[async_trait]
pub trait TypingStore: Send + Sync + fmt::Debug {
    /// Inserts or refreshes the (conversation, user) row so it expires at `now + ttl`.
    async fn upsert(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Result<TypingIndicator>;

    async fn find(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<TypingIndicator>>;

    async fn list_for_conversation(&self, conversation_id: Uuid) -> Result<Vec<TypingIndicator>>;

    /// Reclaims rows whose window closed at or before `now`.
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64>;
}

#[async_trait]
pub trait BlockStore: Send + Sync + fmt::Debug {
    /// Records the block, or returns the existing record unchanged.
    async fn insert(&self, blocker: Uuid, blocked: Uuid, now: OffsetDateTime) -> Result<BlockedUser>;

    /// Returns whether a record was removed.
    async fn delete(&self, blocker: Uuid, blocked: Uuid) -> Result<bool>;

    async fn exists(&self, blocker: Uuid, blocked: Uuid) -> Result<bool>;

    async fn list_for_blocker(&self, blocker: Uuid) -> Result<Vec<BlockedUser>>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync + fmt::Debug {
    /// Records metadata against a live message sent by `sender`. The message is
    /// re-checked under the same lock or transaction as the insert.
    ///
    /// Returns `AppError::NotFound` if the message does not exist, and the errors
    /// of [`Message::ensure_attachable`] otherwise.
    async fn insert(
        &self,
        id: Uuid,
        message_id: Uuid,
        sender: Uuid,
        attachment: ValidatedAttachment,
        now: OffsetDateTime,
    ) -> Result<MessageAttachment>;

    async fn list_for_message(&self, message_id: Uuid) -> Result<Vec<MessageAttachment>>;
}

/// The full set of storage handles the services are wired with.
#[derive(Clone, Debug)]
pub struct Stores {
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub typing: Arc<dyn TypingStore>,
    pub blocks: Arc<dyn BlockStore>,
    pub attachments: Arc<dyn AttachmentStore>,
}

impl Stores {
    /// Shares one backend behind every seam.
    #[must_use]
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ConversationStore + MessageStore + TypingStore + BlockStore + AttachmentStore + 'static,
    {
        Self {
            conversations: Arc::clone(&backend) as Arc<dyn ConversationStore>,
            messages: Arc::clone(&backend) as Arc<dyn MessageStore>,
            typing: Arc::clone(&backend) as Arc<dyn TypingStore>,
            blocks: Arc::clone(&backend) as Arc<dyn BlockStore>,
            attachments: backend as Arc<dyn AttachmentStore>,
        }
    }
}
