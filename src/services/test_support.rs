use crate::adapters::memory::InMemoryStore;
use crate::adapters::store::Stores;
use crate::config::MessagingConfig;
use crate::domain::attachment::AttachmentPolicy;
use crate::domain::clock::{Clock, ManualClock};
use crate::domain::notification::DmEvent;
use crate::services::attachment_service::AttachmentService;
use crate::services::block_service::BlockService;
use crate::services::conversation_service::ConversationService;
use crate::services::message_service::MessageService;
use crate::services::notification_service::Notifier;
use crate::services::typing_service::TypingService;
use std::sync::{Arc, Mutex};
use time::Duration;
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    events: Mutex<Vec<(Uuid, DmEvent)>>,
}

impl RecordingNotifier {
    pub(crate) fn events_for(&self, user: Uuid) -> Vec<DmEvent> {
        self.events.lock().unwrap().iter().filter(|(u, _)| *u == user).map(|(_, e)| *e).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user_id: Uuid, event: DmEvent) {
        self.events.lock().unwrap().push((user_id, event));
    }
}

/// Every service wired over one in-memory store and a manual clock.
pub(crate) struct Harness {
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) conversations: ConversationService,
    pub(crate) messages: MessageService,
    pub(crate) typing: TypingService,
    pub(crate) blocks: BlockService,
    pub(crate) attachments: AttachmentService,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let shared_clock: Arc<dyn Clock> = clock.clone();

        let conversations = ConversationService::new(
            stores.conversations.clone(),
            stores.messages.clone(),
            stores.blocks.clone(),
            shared_clock.clone(),
        );
        let messages = MessageService::new(
            conversations.clone(),
            stores.messages.clone(),
            notifier.clone(),
            shared_clock.clone(),
            MessagingConfig { max_content_chars: 5000, default_page_size: 50, max_page_size: 100 },
        );
        let typing =
            TypingService::new(conversations.clone(), stores.typing.clone(), shared_clock.clone(), Duration::seconds(3));
        let blocks = BlockService::new(stores.blocks.clone(), shared_clock.clone());
        let attachments = AttachmentService::new(
            conversations.clone(),
            stores.messages.clone(),
            stores.attachments.clone(),
            AttachmentPolicy { max_size_bytes: 10 * 1024 * 1024, reject_unknown_types: false },
            shared_clock,
        );

        Self { clock, notifier, conversations, messages, typing, blocks, attachments }
    }
}
