use crate::adapters::store::{AttachmentStore, MessageStore};
use crate::domain::attachment::{AttachmentCandidate, AttachmentPolicy, MessageAttachment, ValidatedAttachment};
use crate::domain::clock::Clock;
use crate::error::{AppError, Result};
use crate::services::conversation_service::ConversationService;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    validations_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            validations_total: meter
                .u64_counter("chirp_attachment_validations_total")
                .with_description("Attachment metadata validations by outcome")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttachmentService {
    conversations: ConversationService,
    messages: Arc<dyn MessageStore>,
    store: Arc<dyn AttachmentStore>,
    policy: AttachmentPolicy,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl AttachmentService {
    #[must_use]
    pub fn new(
        conversations: ConversationService,
        messages: Arc<dyn MessageStore>,
        store: Arc<dyn AttachmentStore>,
        policy: AttachmentPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { conversations, messages, store, policy, clock, metrics: Metrics::new() }
    }

    /// Runs the attachment policy without touching storage.
    ///
    /// # Errors
    /// Returns `AppError::AttachmentRejected` describing the violated rule.
    pub fn validate(&self, candidate: AttachmentCandidate) -> Result<ValidatedAttachment> {
        let result = self.policy.validate(candidate);
        let outcome = if result.is_ok() { "accepted" } else { "rejected" };
        self.metrics.validations_total.add(1, &[KeyValue::new("outcome", outcome)]);
        result
    }

    /// Validates and records attachment metadata on a message the caller sent.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Unauthorized` if `actor` did not send it.
    /// Returns `AppError::AlreadyDeleted` if it was soft-deleted.
    /// Returns `AppError::AttachmentRejected` if the metadata fails the policy.
    #[tracing::instrument(err(level = "warn"), skip(self, candidate), fields(file_name = %candidate.file_name, file_size = candidate.file_size))]
    pub async fn attach(
        &self,
        message_id: Uuid,
        actor: Uuid,
        candidate: AttachmentCandidate,
    ) -> Result<MessageAttachment> {
        let message = self.messages.find_by_id(message_id).await?.ok_or(AppError::NotFound)?;
        message.ensure_attachable(actor)?;

        let validated = self.validate(candidate)?;
        self.store.insert(Uuid::now_v7(), message.id, actor, validated, self.clock.now()).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::NotAParticipant`.
    pub async fn list(&self, message_id: Uuid, user: Uuid) -> Result<Vec<MessageAttachment>> {
        let message = self.messages.find_by_id(message_id).await?.ok_or(AppError::NotFound)?;
        self.conversations.get(message.conversation_id, user).await?;
        self.store.list_for_message(message.id).await
    }
}
