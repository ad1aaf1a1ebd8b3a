//! Process-local storage backed by `DashMap`.
//!
//! Used for single-node deployments without Postgres and by the test suite.
//! Row-level atomicity is provided by the map's entry and shard locks; a lock
//! on one map is never held while taking a second lock on the same map.

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
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: DashMap<Uuid, Conversation>,
    pairs: DashMap<ParticipantPair, Uuid>,
    messages: DashMap<Uuid, Message>,
    next_seq: AtomicI64,
    receipts: DashMap<(Uuid, Uuid), ReadReceipt>,
    typing: DashMap<(Uuid, Uuid), TypingIndicator>,
    blocks: DashMap<(Uuid, Uuid), BlockedUser>,
    attachments: DashMap<Uuid, MessageAttachment>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_receipt(&self, message_id: Uuid, reader_id: Uuid, now: OffsetDateTime) {
        self.receipts.entry((message_id, reader_id)).or_insert_with(|| ReadReceipt {
            message_id,
            reader_id,
            read_at: now,
        });
    }
}

fn page_len(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_or_create(&self, id: Uuid, pair: ParticipantPair, now: OffsetDateTime) -> Result<Conversation> {
        let conversation_id = *self.pairs.entry(pair).or_insert_with(|| {
            self.conversations.insert(id, Conversation::new(id, pair, now));
            id
        });

        self.conversations.get(&conversation_id).map(|c| c.clone()).ok_or(AppError::Internal)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.conversations.get(&id).map(|c| c.clone()))
    }

    async fn find_by_pair(&self, pair: ParticipantPair) -> Result<Option<Conversation>> {
        let Some(id) = self.pairs.get(&pair).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.conversations.get(&id).map(|c| c.clone()))
    }

    async fn update_state(
        &self,
        id: Uuid,
        slot: Slot,
        change: StateChange,
        now: OffsetDateTime,
    ) -> Result<Conversation> {
        let mut conversation = self.conversations.get_mut(&id).ok_or(AppError::NotFound)?;
        conversation.apply(slot, change, now);
        Ok(conversation.clone())
    }

    async fn list_for_user(&self, user: Uuid, archived: bool, limit: i64) -> Result<Vec<Conversation>> {
        let mut matching: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|c| c.state_of(user).is_ok_and(|state| state.archived == archived))
            .map(|c| c.clone())
            .collect();

        matching.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        matching.truncate(page_len(limit));
        Ok(matching)
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert(&self, message: NewMessage) -> Result<Message> {
        let mut conversation = self.conversations.get_mut(&message.conversation_id).ok_or(AppError::NotFound)?;
        conversation.touch(message.created_at);

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = Message::from_new(message, seq);
        self.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Message>> {
        Ok(self.messages.get(&id).map(|m| m.clone()))
    }

    async fn transition(&self, id: Uuid, apply: MessageTransition<'_>) -> Result<Message> {
        let mut stored = self.messages.get_mut(&id).ok_or(AppError::NotFound)?;
        let mut next = stored.clone();
        apply(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }

    async fn mark_read(&self, id: Uuid, reader: Uuid, now: OffsetDateTime) -> Result<ReadOutcome> {
        let (message, transitioned) = {
            let mut stored = self.messages.get_mut(&id).ok_or(AppError::NotFound)?;
            let transitioned = stored.mark_read(now);
            (stored.clone(), transitioned)
        };
        self.record_receipt(id, reader, now);
        Ok(ReadOutcome { message, transitioned })
    }

    async fn mark_all_read(
        &self,
        conversation_id: Uuid,
        sender: Uuid,
        reader: Uuid,
        now: OffsetDateTime,
    ) -> Result<u64> {
        let mut transitioned = Vec::new();
        for mut message in self.messages.iter_mut() {
            if message.conversation_id == conversation_id && message.sender_id == sender && message.is_unread() {
                message.mark_read(now);
                transitioned.push(message.id);
            }
        }

        for id in &transitioned {
            self.record_receipt(*id, reader, now);
        }
        Ok(u64::try_from(transitioned.len()).unwrap_or(u64::MAX))
    }

    async fn page(&self, conversation_id: Uuid, before: Option<TimelineCursor>, limit: i64) -> Result<Vec<Message>> {
        let mut page: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| before.is_none_or(|cursor| m.cursor() < cursor))
            .map(|m| m.clone())
            .collect();

        page.sort_by_key(|m| std::cmp::Reverse(m.cursor()));
        page.truncate(page_len(limit));
        Ok(page)
    }

    async fn latest(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .max_by_key(|m| m.cursor())
            .map(|m| m.clone()))
    }

    async fn count_unread(&self, conversation_id: Uuid, sender: Uuid) -> Result<i64> {
        let count = self
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.sender_id == sender && m.is_unread())
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn receipts(&self, message_id: Uuid) -> Result<Vec<ReadReceipt>> {
        let mut receipts: Vec<ReadReceipt> =
            self.receipts.iter().filter(|r| r.message_id == message_id).map(|r| r.clone()).collect();
        receipts.sort_by_key(|r| r.read_at);
        Ok(receipts)
    }
}

#[async_trait]
impl TypingStore for InMemoryStore {
    async fn upsert(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Result<TypingIndicator> {
        if !self.conversations.contains_key(&conversation_id) {
            return Err(AppError::NotFound);
        }

        let indicator = self
            .typing
            .entry((conversation_id, user_id))
            .and_modify(|existing| existing.refresh(now, ttl))
            .or_insert_with(|| TypingIndicator::start(conversation_id, user_id, now, ttl))
            .clone();
        Ok(indicator)
    }

    async fn find(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<TypingIndicator>> {
        Ok(self.typing.get(&(conversation_id, user_id)).map(|t| t.clone()))
    }

    async fn list_for_conversation(&self, conversation_id: Uuid) -> Result<Vec<TypingIndicator>> {
        Ok(self.typing.iter().filter(|t| t.conversation_id == conversation_id).map(|t| t.clone()).collect())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let mut removed = 0;
        self.typing.retain(|_, indicator| {
            let keep = indicator.is_active_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[async_trait]
impl BlockStore for InMemoryStore {
    async fn insert(&self, blocker: Uuid, blocked: Uuid, now: OffsetDateTime) -> Result<BlockedUser> {
        let record = self
            .blocks
            .entry((blocker, blocked))
            .or_insert_with(|| BlockedUser { blocker_id: blocker, blocked_id: blocked, blocked_at: now })
            .clone();
        Ok(record)
    }

    async fn delete(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        Ok(self.blocks.remove(&(blocker, blocked)).is_some())
    }

    async fn exists(&self, blocker: Uuid, blocked: Uuid) -> Result<bool> {
        Ok(self.blocks.contains_key(&(blocker, blocked)))
    }

    async fn list_for_blocker(&self, blocker: Uuid) -> Result<Vec<BlockedUser>> {
        let mut blocks: Vec<BlockedUser> =
            self.blocks.iter().filter(|b| b.blocker_id == blocker).map(|b| b.clone()).collect();
        blocks.sort_by(|a, b| b.blocked_at.cmp(&a.blocked_at));
        Ok(blocks)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryStore {
    async fn insert(
        &self,
        id: Uuid,
        message_id: Uuid,
        sender: Uuid,
        attachment: ValidatedAttachment,
        now: OffsetDateTime,
    ) -> Result<MessageAttachment> {
        // Held until the insert so a concurrent soft delete waits.
        let message = self.messages.get(&message_id).ok_or(AppError::NotFound)?;
        message.ensure_attachable(sender)?;

        let stored = MessageAttachment {
            id,
            message_id,
            file_type: attachment.file_type,
            file_size: attachment.file_size,
            file_name: attachment.file_name,
            mime_type: attachment.mime_type,
            thumbnail_ref: attachment.thumbnail_ref,
            created_at: now,
        };
        self.attachments.insert(id, stored.clone());
        drop(message);
        Ok(stored)
    }

    async fn list_for_message(&self, message_id: Uuid) -> Result<Vec<MessageAttachment>> {
        let mut attachments: Vec<MessageAttachment> =
            self.attachments.iter().filter(|a| a.message_id == message_id).map(|a| a.clone()).collect();
        attachments.sort_by_key(|a| (a.created_at, a.id));
        Ok(attachments)
    }
}
