use crate::adapters::database::DbPool;
use crate::adapters::database::attachment_repo::AttachmentRepository;
use crate::adapters::database::block_repo::BlockRepository;
use crate::adapters::database::conversation_repo::ConversationRepository;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::database::receipt_repo::ReceiptRepository;
use crate::adapters::database::typing_repo::TypingRepository;
use crate::adapters::store::{
    AttachmentStore, BlockStore, ConversationStore, MessageStore, MessageTransition, TypingStore,
};
use crate::domain::attachment::{MessageAttachment, ValidatedAttachment};
use crate::domain::block::BlockedUser;
use crate::domain::conversation::{Conversation, ParticipantPair, Slot, StateChange};
use crate::domain::message::{Message, NewMessage, ReadOutcome, TimelineCursor};
use crate::domain::receipt::ReadReceipt;
use crate::domain::typing::TypingIndicator;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Postgres-backed storage. Owns transaction boundaries and delegates each
/// statement to a repository.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: DbPool,
    conversations: ConversationRepository,
    messages: MessageRepository,
    receipts: ReceiptRepository,
    typing: TypingRepository,
    blocks: BlockRepository,
    attachments: AttachmentRepository,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self {
            pool,
            conversations: ConversationRepository::new(),
            messages: MessageRepository::new(),
            receipts: ReceiptRepository::new(),
            typing: TypingRepository::new(),
            blocks: BlockRepository::new(),
            attachments: AttachmentRepository::new(),
        }
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn get_or_create(&self, id: Uuid, pair: ParticipantPair, now: OffsetDateTime) -> Result<Conversation> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.get_or_create(&mut conn, id, pair, now).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.find_by_id(&mut conn, id).await
    }

    async fn find_by_pair(&self, pair: ParticipantPair) -> Result<Option<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.find_by_pair(&mut conn, pair).await
    }

    async fn update_state(
        &self,
        id: Uuid,
        slot: Slot,
        change: StateChange,
        now: OffsetDateTime,
    ) -> Result<Conversation> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.update_state(&mut conn, id, slot, change, now).await
    }

    async fn list_for_user(&self, user: Uuid, archived: bool, limit: i64) -> Result<Vec<Conversation>> {
        let mut conn = self.pool.acquire().await?;
        self.conversations.list_for_user(&mut conn, user, archived, limit).await
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert(&self, message: NewMessage) -> Result<Message> {
        let mut tx = self.pool.begin().await?;
        let stored = self.messages.insert(&mut tx, &message).await?;
        self.conversations.touch(&mut tx, message.conversation_id, message.created_at).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>> {
        let mut conn = self.pool.acquire().await?;
        self.messages.find_by_id(&mut conn, id).await
    }

    async fn transition(&self, id: Uuid, apply: MessageTransition<'_>) -> Result<Message> {
        let mut tx = self.pool.begin().await?;
        let mut message = self.messages.find_for_update(&mut tx, id).await?.ok_or(AppError::NotFound)?;
        apply(&mut message)?;
        let saved = self.messages.save_state(&mut tx, &message).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn mark_read(&self, id: Uuid, reader: Uuid, now: OffsetDateTime) -> Result<ReadOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut message = self.messages.find_for_update(&mut tx, id).await?.ok_or(AppError::NotFound)?;
        let transitioned = message.mark_read(now);
        if transitioned {
            message = self.messages.save_state(&mut tx, &message).await?;
        }
        self.receipts.insert(&mut tx, id, reader, now).await?;
        tx.commit().await?;
        Ok(ReadOutcome { message, transitioned })
    }

    async fn mark_all_read(
        &self,
        conversation_id: Uuid,
        sender: Uuid,
        reader: Uuid,
        now: OffsetDateTime,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let ids = self.messages.mark_all_read(&mut tx, conversation_id, sender, now).await?;
        self.receipts.insert_many(&mut tx, &ids, reader, now).await?;
        tx.commit().await?;
        Ok(u64::try_from(ids.len()).unwrap_or(u64::MAX))
    }

    async fn page(&self, conversation_id: Uuid, before: Option<TimelineCursor>, limit: i64) -> Result<Vec<Message>> {
        let mut conn = self.pool.acquire().await?;
        self.messages.page(&mut conn, conversation_id, before, limit).await
    }

    async fn latest(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        let mut conn = self.pool.acquire().await?;
        self.messages.latest(&mut conn, conversation_id).await
    }

    async fn count_unread(&self, conversation_id: Uuid, sender: Uuid) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        self.messages.count_unread(&mut conn, conversation_id, sender).await
    }

    async fn receipts(&self, message_id: Uuid) -> Result<Vec<ReadReceipt>> {
        let mut conn = self.pool.acquire().await?;
        self.receipts.list_for_message(&mut conn, message_id).await
    }
}

#[async_trait]
impl TypingStore for PgStore {
    async fn upsert(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Result<TypingIndicator> {
        let mut conn = self.pool.acquire().await?;
        self.typing.upsert(&mut conn, conversation_id, user_id, now, now + ttl).await
    }

    async fn find(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<TypingIndicator>> {
        let mut conn = self.pool.acquire().await?;
        self.typing.find(&mut conn, conversation_id, user_id).await
    }

    async fn list_for_conversation(&self, conversation_id: Uuid) -> Result<Vec<TypingIndicator>> {
        let mut conn = self.pool.acquire().await?;
        self.typing.list_for_conversation(&mut conn, conversation_id).await
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        self.typing.delete_expired(&mut conn, now).await
    }
}

#[async_trait]
impl BlockStore for PgStore {
    async fn insert(&self, blocker: Uuid, blocked: Uuid, now: OffsetDateTime) -> Result<BlockedUser> {
        let mut conn = self.pool.acquire().await?;
        self.blocks.insert(&mut conn, blocker, blocked, now).await
    }

    async fn delete(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        self.blocks.delete(&mut conn, blocker, blocked).await
    }

    async fn exists(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        self.blocks.exists(&mut conn, blocker, blocked).await
    }

    async fn list_for_blocker(&self, blocker: Uuid) -> Result<Vec<BlockedUser>> {
        let mut conn = self.pool.acquire().await?;
        self.blocks.list_for_blocker(&mut conn, blocker).await
    }
}

#[async_trait]
impl AttachmentStore for PgStore {
    async fn insert(
        &self,
        id: Uuid,
        message_id: Uuid,
        sender: Uuid,
        attachment: ValidatedAttachment,
        now: OffsetDateTime,
    ) -> Result<MessageAttachment> {
        let mut tx = self.pool.begin().await?;
        let message = self.messages.find_for_update(&mut tx, message_id).await?.ok_or(AppError::NotFound)?;
        message.ensure_attachable(sender)?;
        let stored = self.attachments.insert(&mut tx, id, message_id, &attachment, now).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn list_for_message(&self, message_id: Uuid) -> Result<Vec<MessageAttachment>> {
        let mut conn = self.pool.acquire().await?;
        self.attachments.list_for_message(&mut conn, message_id).await
    }
}
