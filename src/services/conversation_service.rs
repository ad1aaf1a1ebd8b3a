use crate::adapters::store::{BlockStore, ConversationStore, MessageStore};
use crate::domain::clock::Clock;
use crate::domain::conversation::{Conversation, ParticipantPair, Slot, StateChange};
use crate::domain::message::Message;
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    created_total: Counter<u64>,
    state_changes_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            created_total: meter
                .u64_counter("chirp_conversations_resolved_total")
                .with_description("Total conversation create-or-fetch calls")
                .build(),
            state_changes_total: meter
                .u64_counter("chirp_conversation_state_changes_total")
                .with_description("Per-participant flag assignments by flag")
                .build(),
        }
    }
}

/// A conversation as seen by one of its participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub other_participant: Uuid,
    pub last_message: Option<Message>,
    pub unread_count: i64,
    pub archived: bool,
    pub muted: bool,
}

#[derive(Clone, Debug)]
pub struct ConversationService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    blocks: Arc<dyn BlockStore>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl ConversationService {
    #[must_use]
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        blocks: Arc<dyn BlockStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { conversations, messages, blocks, clock, metrics: Metrics::new() }
    }

    /// Returns the single conversation between two users, creating it on first contact.
    ///
    /// # Errors
    /// Returns `AppError::InvalidParticipants` if both ids are the same user.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> Result<Conversation> {
        let pair = ParticipantPair::new(user_a, user_b)?;
        let conversation = self.conversations.get_or_create(Uuid::now_v7(), pair, self.clock.now()).await?;
        self.metrics.created_total.add(1, &[]);
        Ok(conversation)
    }

    /// Loads a conversation on behalf of one of its participants.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::NotAParticipant` if `user` is not in it.
    #[tracing::instrument(level = "debug", err(level = "warn"), skip(self))]
    pub async fn get(&self, conversation_id: Uuid, user: Uuid) -> Result<Conversation> {
        let conversation = self.conversations.find_by_id(conversation_id).await?.ok_or(AppError::NotFound)?;
        conversation.slot_of(user)?;
        Ok(conversation)
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    /// Returns `AppError::NotAParticipant` if `user` is not in it.
    pub async fn other_participant(&self, conversation_id: Uuid, user: Uuid) -> Result<Uuid> {
        self.get(conversation_id, user).await?.other_participant(user)
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn archive(&self, conversation_id: Uuid, user: Uuid) -> Result<Conversation> {
        self.set_flag(conversation_id, user, StateChange::Archived(true)).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn unarchive(&self, conversation_id: Uuid, user: Uuid) -> Result<Conversation> {
        self.set_flag(conversation_id, user, StateChange::Archived(false)).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn mute(&self, conversation_id: Uuid, user: Uuid) -> Result<Conversation> {
        self.set_flag(conversation_id, user, StateChange::Muted(true)).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn unmute(&self, conversation_id: Uuid, user: Uuid) -> Result<Conversation> {
        self.set_flag(conversation_id, user, StateChange::Muted(false)).await
    }

    /// Blocks `blocked` from sending in this conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotAParticipant` if `blocker` is not in the conversation.
    /// Returns `AppError::InvalidParticipants` if `blocked` is not the other participant.
    pub async fn block(&self, conversation_id: Uuid, blocker: Uuid, blocked: Uuid) -> Result<Conversation> {
        self.set_block(conversation_id, blocker, blocked, true).await
    }

    /// # Errors
    /// Same as [`Self::block`].
    pub async fn unblock(&self, conversation_id: Uuid, blocker: Uuid, blocked: Uuid) -> Result<Conversation> {
        self.set_block(conversation_id, blocker, blocked, false).await
    }

    /// Whether the other participant has blocked `sender` in this conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn is_blocked(&self, conversation_id: Uuid, sender: Uuid) -> Result<bool> {
        self.get(conversation_id, sender).await?.is_blocked(sender)
    }

    /// Send gate: consults the conversation flag and the global block list.
    ///
    /// # Errors
    /// Returns `AppError::SenderBlocked` if either source blocks `sender`.
    /// Returns `AppError::NotAParticipant` if `sender` is not in the conversation.
    #[tracing::instrument(level = "debug", err(level = "warn"), skip(self, conversation), fields(conversation_id = %conversation.id))]
    pub async fn ensure_can_send(&self, conversation: &Conversation, sender: Uuid) -> Result<()> {
        if conversation.is_blocked(sender)? {
            return Err(AppError::SenderBlocked);
        }
        let recipient = conversation.other_participant(sender)?;
        if self.blocks.exists(recipient, sender).await? {
            return Err(AppError::SenderBlocked);
        }
        Ok(())
    }

    /// Messages from the other participant that `user` has not read, excluding deleted ones.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    #[tracing::instrument(level = "debug", err(level = "warn"), skip(self))]
    pub async fn unread_count(&self, conversation_id: Uuid, user: Uuid) -> Result<i64> {
        let conversation = self.get(conversation_id, user).await?;
        let sender = conversation.other_participant(user)?;
        self.messages.count_unread(conversation.id, sender).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn summary(&self, conversation_id: Uuid, user: Uuid) -> Result<ConversationSummary> {
        let conversation = self.get(conversation_id, user).await?;
        self.summarize(conversation, user).await
    }

    /// The inbox (or archive) of `user`, most recently active first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if storage fails.
    #[tracing::instrument(err(level = "warn"), skip(self))]
    pub async fn list(&self, user: Uuid, archived: bool, limit: i64) -> Result<Vec<ConversationSummary>> {
        let conversations = self.conversations.list_for_user(user, archived, limit).await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            summaries.push(self.summarize(conversation, user).await?);
        }
        Ok(summaries)
    }

    async fn summarize(&self, conversation: Conversation, user: Uuid) -> Result<ConversationSummary> {
        let state = *conversation.state_of(user)?;
        let other_participant = conversation.other_participant(user)?;
        let last_message = self.messages.latest(conversation.id).await?;
        let unread_count = self.messages.count_unread(conversation.id, other_participant).await?;

        Ok(ConversationSummary {
            conversation,
            other_participant,
            last_message,
            unread_count,
            archived: state.archived,
            muted: state.muted,
        })
    }

    #[tracing::instrument(err(level = "warn"), skip(self))]
    async fn set_flag(&self, conversation_id: Uuid, user: Uuid, change: StateChange) -> Result<Conversation> {
        let slot = self.get(conversation_id, user).await?.slot_of(user)?;
        self.apply(conversation_id, slot, change).await
    }

    #[tracing::instrument(err(level = "warn"), skip(self))]
    async fn set_block(&self, conversation_id: Uuid, blocker: Uuid, blocked: Uuid, value: bool) -> Result<Conversation> {
        let slot = self.get(conversation_id, blocker).await?.block_target(blocker, blocked)?;
        self.apply(conversation_id, slot, StateChange::BlockedOther(value)).await
    }

    async fn apply(&self, conversation_id: Uuid, slot: Slot, change: StateChange) -> Result<Conversation> {
        let flag = match change {
            StateChange::Archived(_) => "archived",
            StateChange::Muted(_) => "muted",
            StateChange::BlockedOther(_) => "blocked",
        };
        let conversation = self.conversations.update_state(conversation_id, slot, change, self.clock.now()).await?;
        self.metrics.state_changes_total.add(1, &[KeyValue::new("flag", flag)]);
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::services::test_support::Harness;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_conversation() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = h.conversations.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 { service.get_or_create(a, b).await } else { service.get_or_create(b, a).await }
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_self_conversation_rejected() {
        let h = Harness::new();
        let a = Uuid::new_v4();
        assert!(matches!(h.conversations.get_or_create(a, a).await, Err(AppError::InvalidParticipants)));
    }

    #[tokio::test]
    async fn test_flags_are_per_participant_and_idempotent() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        h.conversations.archive(conv.id, a).await.unwrap();
        let again = h.conversations.archive(conv.id, a).await.unwrap();
        h.conversations.mute(conv.id, b).await.unwrap();

        assert!(again.state_of(a).unwrap().archived);
        let summary_a = h.conversations.summary(conv.id, a).await.unwrap();
        let summary_b = h.conversations.summary(conv.id, b).await.unwrap();
        assert!(summary_a.archived && !summary_a.muted);
        assert!(!summary_b.archived && summary_b.muted);

        h.conversations.unarchive(conv.id, a).await.unwrap();
        assert!(!h.conversations.summary(conv.id, a).await.unwrap().archived);
    }

    #[tokio::test]
    async fn test_outsider_cannot_change_flags() {
        let h = Harness::new();
        let conv = h.conversations.get_or_create(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        assert!(matches!(h.conversations.mute(conv.id, Uuid::new_v4()).await, Err(AppError::NotAParticipant)));
        assert!(matches!(h.conversations.mute(Uuid::new_v4(), Uuid::new_v4()).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_conversation_block_is_directional() {
        let h = Harness::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = h.conversations.get_or_create(a, b).await.unwrap();

        h.conversations.block(conv.id, a, b).await.unwrap();
        assert!(h.conversations.is_blocked(conv.id, b).await.unwrap());
        assert!(!h.conversations.is_blocked(conv.id, a).await.unwrap());

        assert!(matches!(h.conversations.block(conv.id, a, a).await, Err(AppError::InvalidParticipants)));

        h.conversations.unblock(conv.id, a, b).await.unwrap();
        assert!(!h.conversations.is_blocked(conv.id, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_inbox_splits_on_archive_flag() {
        let h = Harness::new();
        let me = Uuid::new_v4();
        let first = h.conversations.get_or_create(me, Uuid::new_v4()).await.unwrap();
        let second = h.conversations.get_or_create(me, Uuid::new_v4()).await.unwrap();

        h.conversations.archive(first.id, me).await.unwrap();

        let inbox = h.conversations.list(me, false, 50).await.unwrap();
        let archive = h.conversations.list(me, true, 50).await.unwrap();
        assert_eq!(inbox.iter().map(|s| s.conversation.id).collect::<Vec<_>>(), vec![second.id]);
        assert_eq!(archive.iter().map(|s| s.conversation.id).collect::<Vec<_>>(), vec![first.id]);
    }
}
