pub mod attachment_service;
pub mod block_service;
pub mod conversation_service;
pub mod health_service;
pub mod message_service;
pub mod notification_service;
pub mod typing_service;

#[cfg(test)]
pub(crate) mod test_support;
