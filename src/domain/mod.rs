pub mod attachment;
pub mod auth;
pub mod block;
pub mod clock;
pub mod conversation;
pub mod message;
pub mod notification;
pub mod receipt;
pub mod typing;
