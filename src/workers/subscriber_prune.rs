use crate::services::notification_service::NotificationService;
use std::time::Duration;
use tokio::sync::watch;
use tracing::Instrument;

/// Periodically removes per-user DM event channels nobody listens to anymore.
#[derive(Debug)]
pub struct SubscriberPruneWorker {
    notifier: NotificationService,
    interval_secs: u64,
}

impl SubscriberPruneWorker {
    #[must_use]
    pub const fn new(notifier: NotificationService, interval_secs: u64) -> Self {
        Self { notifier, interval_secs }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        tracing::info!(interval_secs = self.interval_secs, "DM subscriber prune worker started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,

                _ = interval.tick() => {
                    async {
                        let pruned = self.notifier.prune_idle_subscriptions();
                        tracing::Span::current().record("pruned", pruned);
                    }
                    .instrument(tracing::debug_span!("dm_subscriber_prune_iteration", pruned = tracing::field::Empty))
                    .await;
                }
            }
        }

        tracing::info!("DM subscriber prune worker shutting down...");
    }
}
