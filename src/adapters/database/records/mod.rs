pub mod attachment;
pub mod block;
pub mod conversation;
pub mod message;
pub mod receipt;
pub mod typing;

pub use attachment::AttachmentRecord;
pub use block::BlockedUserRecord;
pub use conversation::ConversationRecord;
pub use message::MessageRecord;
pub use receipt::ReadReceiptRecord;
pub use typing::TypingIndicatorRecord;
