use crate::adapters::store::MessageStore;
use crate::config::MessagingConfig;
use crate::domain::clock::Clock;
use crate::domain::conversation::Conversation;
use crate::domain::message::{Message, NewMessage, ReadOutcome, TimelineCursor, validate_content};
use crate::domain::notification::DmEvent;
use crate::domain::receipt::ReadReceipt;
use crate::error::{AppError, Result};
use crate::services::conversation_service::ConversationService;
use crate::services::notification_service::Notifier;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    sent_total: Counter<u64>,
    transitions_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            sent_total: meter
                .u64_counter("chirp_messages_sent_total")
                .with_description("Total send attempts by outcome")
                .build(),
            transitions_total: meter
                .u64_counter("chirp_message_transitions_total")
                .with_description("Message lifecycle transitions by kind")
                .build(),
        }
    }
}

/// A newest-first slice of a timeline. `next_before` is set when older
/// messages may exist.
#[derive(Debug, Clone)]
pub struct TimelinePage {
    pub messages: Vec<Message>,
    pub next_before: Option<Uuid>,
}

#[derive(Clone, Debug)]
pub struct MessageService {
    conversations: ConversationService,
    store: Arc<dyn MessageStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: MessagingConfig,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(
        conversations: ConversationService,
        store: Arc<dyn MessageStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: MessagingConfig,
    ) -> Self {
        Self { conversations, store, notifier, clock, config, metrics: Metrics::new() }
    }

    /// Sends a message into an existing conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::NotAParticipant` if `sender` is not in it.
    /// Returns `AppError::SenderBlocked` if the recipient blocked `sender`.
    /// Returns `AppError::ContentTooLong` or `AppError::BadRequest` for invalid content.
    #[tracing::instrument(err(level = "warn"), skip(self, content), fields(content_len = content.len()))]
    pub async fn send(&self, conversation_id: Uuid, sender: Uuid, content: String) -> Result<Message> {
        let conversation = self.conversations.get(conversation_id, sender).await?;
        self.send_in(&conversation, sender, content).await
    }

    /// Sends to a user, creating the conversation on first contact.
    ///
    /// # Errors
    /// Returns `AppError::InvalidParticipants` if `sender == recipient`.
    /// Otherwise fails as [`Self::send`] does.
    #[tracing::instrument(err(level = "warn"), skip(self, content), fields(content_len = content.len()))]
    pub async fn send_to_user(&self, sender: Uuid, recipient: Uuid, content: String) -> Result<Message> {
        validate_content(&content, self.config.max_content_chars)?;
        let conversation = self.conversations.get_or_create(sender, recipient).await?;
        self.send_in(&conversation, sender, content).await
    }

    async fn send_in(&self, conversation: &Conversation, sender: Uuid, content: String) -> Result<Message> {
        let result = self.try_send(conversation, sender, content).await;

        let status = match &result {
            Ok(_) => "sent",
            Err(AppError::SenderBlocked) => "blocked",
            Err(_) => "rejected",
        };
        self.metrics.sent_total.add(1, &[KeyValue::new("status", status)]);

        let message = result?;
        let recipient = conversation.other_participant(sender)?;
        if conversation.state_of(recipient)?.muted {
            tracing::debug!(%recipient, "Recipient muted the conversation, skipping notification");
        } else {
            self.notifier.notify(
                recipient,
                DmEvent::MessageReceived { conversation_id: conversation.id, message_id: message.id },
            );
        }
        Ok(message)
    }

    async fn try_send(&self, conversation: &Conversation, sender: Uuid, content: String) -> Result<Message> {
        conversation.slot_of(sender)?;
        self.conversations.ensure_can_send(conversation, sender).await?;
        validate_content(&content, self.config.max_content_chars)?;

        self.store
            .insert(NewMessage {
                id: Uuid::now_v7(),
                conversation_id: conversation.id,
                sender_id: sender,
                content,
                created_at: self.clock.now(),
            })
            .await
    }

    /// Loads a message on behalf of a participant of its conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::NotAParticipant` if `user` is not in its conversation.
    pub async fn get(&self, message_id: Uuid, user: Uuid) -> Result<Message> {
        let message = self.store.find_by_id(message_id).await?.ok_or(AppError::NotFound)?;
        self.conversations.get(message.conversation_id, user).await?;
        Ok(message)
    }

    /// Marks a message read by `reader` and records a receipt. Repeated calls
    /// leave `read_at` untouched; a sender reading their own message is a no-op.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::NotAParticipant` if `reader` is not in its conversation.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn mark_read(&self, message_id: Uuid, reader: Uuid) -> Result<Message> {
        let message = self.get(message_id, reader).await?;
        if message.sender_id == reader {
            return Ok(message);
        }

        let ReadOutcome { message: updated, transitioned } =
            self.store.mark_read(message_id, reader, self.clock.now()).await?;
        if transitioned {
            self.metrics.transitions_total.add(1, &[KeyValue::new("kind", "read")]);
            self.notifier.notify(
                updated.sender_id,
                DmEvent::MessageRead { conversation_id: updated.conversation_id, message_id: updated.id },
            );
        }
        Ok(updated)
    }

    /// Marks every unread incoming message of the conversation read for `reader`.
    /// Returns how many messages changed.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn mark_conversation_read(&self, conversation_id: Uuid, reader: Uuid) -> Result<u64> {
        let conversation = self.conversations.get(conversation_id, reader).await?;
        let sender = conversation.other_participant(reader)?;

        let count = self.store.mark_all_read(conversation.id, sender, reader, self.clock.now()).await?;
        if count > 0 {
            self.metrics.transitions_total.add(count, &[KeyValue::new("kind", "read")]);
        }
        Ok(count)
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Unauthorized` if `editor` is not the sender.
    /// Returns `AppError::AlreadyDeleted` if the message was soft-deleted.
    /// Returns `AppError::ContentTooLong` or `AppError::BadRequest` for invalid content.
    #[tracing::instrument(err(level = "warn"), skip(self, content))]
    pub async fn edit(&self, message_id: Uuid, editor: Uuid, content: String) -> Result<Message> {
        let now = self.clock.now();
        let max_chars = self.config.max_content_chars;

        let edited =
            self.store.transition(message_id, &|m: &mut Message| m.edit(editor, content.clone(), max_chars, now)).await?;
        self.metrics.transitions_total.add(1, &[KeyValue::new("kind", "edit")]);
        Ok(edited)
    }

    /// Idempotent soft delete. Stored content is retained.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Unauthorized` if `actor` is not the sender.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn soft_delete(&self, message_id: Uuid, actor: Uuid) -> Result<Message> {
        let deleted = self.store.transition(message_id, &|m: &mut Message| m.soft_delete(actor)).await?;
        self.metrics.transitions_total.add(1, &[KeyValue::new("kind", "delete")]);
        Ok(deleted)
    }

    /// Newest-first page of the conversation strictly older than `before`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant` for the conversation.
    /// Returns `AppError::BadRequest` if `before` is not a message of this conversation.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn timeline(
        &self,
        conversation_id: Uuid,
        user: Uuid,
        before: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<TimelinePage> {
        let conversation = self.conversations.get(conversation_id, user).await?;
        let limit = limit.unwrap_or(self.config.default_page_size).clamp(1, self.config.max_page_size.max(1));

        let cursor = match before {
            Some(id) => Some(self.cursor_for(conversation.id, id).await?),
            None => None,
        };

        let messages = self.store.page(conversation.id, cursor, limit).await?;
        let next_before = if i64::try_from(messages.len()).is_ok_and(|len| len == limit) {
            messages.last().map(|m| m.id)
        } else {
            None
        };
        Ok(TimelinePage { messages, next_before })
    }

    async fn cursor_for(&self, conversation_id: Uuid, message_id: Uuid) -> Result<TimelineCursor> {
        match self.store.find_by_id(message_id).await? {
            Some(m) if m.conversation_id == conversation_id => Ok(m.cursor()),
            _ => Err(AppError::BadRequest("Unknown pagination cursor".into())),
        }
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn receipts(&self, message_id: Uuid, user: Uuid) -> Result<Vec<ReadReceipt>> {
        let message = self.get(message_id, user).await?;
        self.store.receipts(message.id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::message::DELETED_PLACEHOLDER;
    use crate::domain::notification::DmEvent;
    use crate::error::AppError;
    use crate::services::test_support::Harness;
    use time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_send_to_user_creates_conversation_lazily() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let msg = h.messages.send_to_user(a, b, "hi".into()).await.unwrap();
        let conv = h.conversations.get_or_create(b, a).await.unwrap();

        assert_eq!(msg.conversation_id, conv.id);
        assert_eq!(h.conversations.unread_count(conv.id, b).await.unwrap(), 1);
        assert_eq!(h.conversations.unread_count(conv.id, a).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_validates_participant_and_content() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        assert!(matches!(
            h.messages.send(conv.id, Uuid::new_v4(), "hi".into()).await,
            Err(AppError::NotAParticipant)
        ));
        assert!(matches!(
            h.messages.send(conv.id, a, "x".repeat(5001)).await,
            Err(AppError::ContentTooLong { max: 5000 })
        ));
        assert!(matches!(h.messages.send(conv.id, a, "  ".into()).await, Err(AppError::BadRequest(_))));
        assert!(h.messages.send(conv.id, a, "x".repeat(5000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_both_block_sources_gate_sending() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        h.conversations.block(conv.id, b, a).await.unwrap();
        assert!(matches!(h.messages.send(conv.id, a, "hi".into()).await, Err(AppError::SenderBlocked)));
        assert!(h.messages.send(conv.id, b, "still me".into()).await.is_ok());

        h.conversations.unblock(conv.id, b, a).await.unwrap();
        assert!(h.messages.send(conv.id, a, "back".into()).await.is_ok());

        h.blocks.block(b, a).await.unwrap();
        assert!(matches!(h.messages.send(conv.id, a, "hi".into()).await, Err(AppError::SenderBlocked)));
        assert!(matches!(h.messages.send_to_user(a, b, "hi".into()).await, Err(AppError::SenderBlocked)));
        assert!(h.messages.send(conv.id, b, "one way".into()).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "hi".into()).await.unwrap();

        let first = h.messages.mark_read(msg.id, b).await.unwrap();
        h.clock.advance(Duration::seconds(30));
        let second = h.messages.mark_read(msg.id, b).await.unwrap();

        assert!(first.is_read);
        assert_eq!(first.read_at, second.read_at);
        assert_eq!(h.messages.receipts(msg.id, a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sender_reading_own_message_is_noop() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "hi".into()).await.unwrap();

        let same = h.messages.mark_read(msg.id, a).await.unwrap();
        assert!(!same.is_read);
        assert!(h.messages.receipts(msg.id, a).await.unwrap().is_empty());
        assert!(matches!(h.messages.mark_read(msg.id, Uuid::new_v4()).await, Err(AppError::NotAParticipant)));
    }

    #[tokio::test]
    async fn test_unread_count_tracks_reads() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        let m1 = h.messages.send(conv.id, a, "one".into()).await.unwrap();
        let m2 = h.messages.send(conv.id, a, "two".into()).await.unwrap();
        h.messages.send(conv.id, a, "three".into()).await.unwrap();
        h.messages.mark_read(m1.id, b).await.unwrap();
        assert_eq!(h.conversations.unread_count(conv.id, b).await.unwrap(), 2);

        h.messages.mark_read(m2.id, b).await.unwrap();
        assert_eq!(h.conversations.unread_count(conv.id, b).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleted_messages_leave_unread_count() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "oops".into()).await.unwrap();

        h.messages.soft_delete(msg.id, a).await.unwrap();
        assert_eq!(h.conversations.unread_count(msg.conversation_id, b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_conversation_read() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();
        for i in 0..3 {
            h.messages.send(conv.id, a, format!("m{i}")).await.unwrap();
        }
        h.messages.send(conv.id, b, "reply".into()).await.unwrap();

        assert_eq!(h.messages.mark_conversation_read(conv.id, b).await.unwrap(), 3);
        assert_eq!(h.messages.mark_conversation_read(conv.id, b).await.unwrap(), 0);
        assert_eq!(h.conversations.unread_count(conv.id, b).await.unwrap(), 0);
        assert_eq!(h.conversations.unread_count(conv.id, a).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_edit_after_delete_is_rejected() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "Original".into()).await.unwrap();

        assert!(matches!(h.messages.edit(msg.id, b, "hijack".into()).await, Err(AppError::Unauthorized)));
        let edited = h.messages.edit(msg.id, a, "Edited".into()).await.unwrap();
        assert!(edited.is_edited);

        let deleted = h.messages.soft_delete(msg.id, a).await.unwrap();
        assert_eq!(deleted.display_content(), DELETED_PLACEHOLDER);
        assert_eq!(deleted.content, "Edited");

        assert!(matches!(h.messages.edit(msg.id, a, "again".into()).await, Err(AppError::AlreadyDeleted)));
        assert!(h.messages.soft_delete(msg.id, a).await.is_ok());
        assert!(matches!(h.messages.soft_delete(msg.id, b).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_edit_keeps_read_state() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "v1".into()).await.unwrap();

        h.messages.mark_read(msg.id, b).await.unwrap();
        let edited = h.messages.edit(msg.id, a, "v2".into()).await.unwrap();
        assert!(edited.is_read && edited.is_edited);
    }

    #[tokio::test]
    async fn test_edit_reports_permission_before_content_errors() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "Original".into()).await.unwrap();

        assert!(matches!(h.messages.edit(msg.id, b, "x".repeat(6000)).await, Err(AppError::Unauthorized)));
        assert!(matches!(h.messages.edit(msg.id, b, "   ".into()).await, Err(AppError::Unauthorized)));
        assert!(matches!(
            h.messages.edit(msg.id, a, "x".repeat(5001)).await,
            Err(AppError::ContentTooLong { max: 5000 })
        ));

        h.messages.soft_delete(msg.id, a).await.unwrap();
        assert!(matches!(h.messages.edit(msg.id, a, "   ".into()).await, Err(AppError::AlreadyDeleted)));
        assert!(matches!(h.messages.edit(msg.id, a, "x".repeat(6000)).await, Err(AppError::AlreadyDeleted)));
        assert_eq!(h.messages.get(msg.id, a).await.unwrap().content, "Original");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_read_and_edit_keep_both_changes() {
        for _ in 0..20 {
            let h = Harness::new();
            let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
            let msg = h.messages.send_to_user(a, b, "v1".into()).await.unwrap();

            let reader = h.messages.clone();
            let editor = h.messages.clone();
            let read = tokio::spawn(async move { reader.mark_read(msg.id, b).await });
            let edit = tokio::spawn(async move { editor.edit(msg.id, a, "v2".into()).await });
            read.await.unwrap().unwrap();
            edit.await.unwrap().unwrap();

            let stored = h.messages.get(msg.id, a).await.unwrap();
            assert!(stored.is_read && stored.is_edited);
            assert_eq!(stored.content, "v2");
            assert_eq!(h.messages.receipts(msg.id, a).await.unwrap().len(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_notify_sender_once() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = h.messages.send_to_user(a, b, "hi".into()).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = h.messages.clone();
                tokio::spawn(async move { service.mark_read(msg.id, b).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().unwrap().is_read);
        }

        assert_eq!(
            h.notifier.events_for(a),
            vec![DmEvent::MessageRead { conversation_id: msg.conversation_id, message_id: msg.id }]
        );
        assert_eq!(h.messages.receipts(msg.id, a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timeline_pages_newest_first() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        let mut sent = Vec::new();
        for i in 0..5 {
            sent.push(h.messages.send(conv.id, a, format!("m{i}")).await.unwrap().id);
        }

        let first = h.messages.timeline(conv.id, b, None, Some(2)).await.unwrap();
        assert_eq!(first.messages.iter().map(|m| m.id).collect::<Vec<_>>(), vec![sent[4], sent[3]]);

        let second = h.messages.timeline(conv.id, b, first.next_before, Some(2)).await.unwrap();
        assert_eq!(second.messages.iter().map(|m| m.id).collect::<Vec<_>>(), vec![sent[2], sent[1]]);

        let last = h.messages.timeline(conv.id, b, second.next_before, Some(2)).await.unwrap();
        assert_eq!(last.messages.iter().map(|m| m.id).collect::<Vec<_>>(), vec![sent[0]]);
        assert!(last.next_before.is_none());

        assert!(matches!(
            h.messages.timeline(conv.id, b, Some(Uuid::new_v4()), None).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_mute_suppresses_notifications() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        let first = h.messages.send(conv.id, a, "loud".into()).await.unwrap();
        h.conversations.mute(conv.id, b).await.unwrap();
        h.messages.send(conv.id, a, "quiet".into()).await.unwrap();

        assert_eq!(
            h.notifier.events_for(b),
            vec![DmEvent::MessageReceived { conversation_id: conv.id, message_id: first.id }]
        );
    }

    #[tokio::test]
    async fn test_sending_bumps_conversation_activity() {
        let h = Harness::new();
        let me = Uuid::new_v4();
        let older = h.conversations.get_or_create(me, Uuid::new_v4()).await.unwrap();
        h.clock.advance(Duration::seconds(1));
        let newer = h.conversations.get_or_create(me, Uuid::new_v4()).await.unwrap();

        h.clock.advance(Duration::seconds(1));
        h.messages.send(older.id, me, "ping".into()).await.unwrap();

        let inbox = h.conversations.list(me, false, 10).await.unwrap();
        assert_eq!(inbox.iter().map(|s| s.conversation.id).collect::<Vec<_>>(), vec![older.id, newer.id]);
        assert_eq!(inbox[0].last_message.as_ref().map(|m| m.content.as_str()), Some("ping"));
    }
}
