pub mod attachments;
pub mod blocks;
pub mod conversations;
pub mod health;
pub mod messages;
pub mod typing;
