pub mod subscriber_prune;
pub mod typing_cleanup;

pub use subscriber_prune::SubscriberPruneWorker;
pub use typing_cleanup::TypingCleanupWorker;
