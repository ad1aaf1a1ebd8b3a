use crate::error::AppError;
use crate::services::typing_service::TypingService;
use opentelemetry::{global, metrics::Counter};
use std::time::Duration;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            reclaimed_total: meter
                .u64_counter("chirp_typing_rows_reclaimed_total")
                .with_description("Total expired typing indicator rows deleted")
                .build(),
        }
    }
}

/// Reclaims storage held by lapsed typing indicators. Liveness never depends on it.
#[derive(Debug)]
pub struct TypingCleanupWorker {
    service: TypingService,
    interval_secs: u64,
    metrics: Metrics,
}

impl TypingCleanupWorker {
    #[must_use]
    pub fn new(service: TypingService, interval_secs: u64) -> Self {
        Self { service, interval_secs: interval_secs.max(1), metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.perform_cleanup()
                        .instrument(tracing::info_span!("typing_cleanup_iteration"))
                        .await
                    {
                        tracing::error!(error = ?e, "Typing cleanup iteration failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Typing cleanup loop shutting down...");
    }

    /// # Errors
    /// Returns an error if storage fails.
    #[tracing::instrument(skip(self), err, fields(reclaimed = tracing::field::Empty))]
    pub async fn perform_cleanup(&self) -> Result<u64, AppError> {
        let count = self.service.reclaim_expired().await?;
        if count > 0 {
            tracing::debug!(count = %count, "Deleted expired typing indicators");
            tracing::Span::current().record("reclaimed", count);
            self.metrics.reclaimed_total.add(count, &[]);
        }
        Ok(count)
    }
}
