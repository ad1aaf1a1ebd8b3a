use crate::domain::notification::DmEvent;
use dashmap::DashMap;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, UpDownCounter},
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Fire-and-forget delivery of DM events to a user. Failures never surface
/// to the caller.
pub trait Notifier: Send + Sync + fmt::Debug {
    fn notify(&self, user_id: Uuid, event: DmEvent);
}

#[derive(Clone, Debug)]
struct Metrics {
    sends_total: Counter<u64>,
    active_channels: UpDownCounter<i64>,
    gc_duration_seconds: Histogram<f64>,
    gc_reclaimed_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("chirp-dm");
        Self {
            sends_total: meter
                .u64_counter("chirp_notifications_sent_total")
                .with_description("Total notification send attempts")
                .build(),
            active_channels: meter
                .i64_up_down_counter("chirp_notification_channels")
                .with_description("Number of active local notification channels")
                .build(),
            gc_duration_seconds: meter
                .f64_histogram("chirp_notification_gc_duration_seconds")
                .with_description("Time taken by one prune of idle DM channels")
                .build(),
            gc_reclaimed_total: meter
                .u64_counter("chirp_notification_channels_reclaimed_total")
                .with_description("Total number of idle DM channels pruned")
                .build(),
        }
    }
}

/// Process-local notifier: one broadcast channel per subscribed user.
#[derive(Clone, Debug)]
pub struct NotificationService {
    channels: Arc<DashMap<Uuid, broadcast::Sender<DmEvent>>>,
    channel_capacity: usize,
    metrics: Metrics,
}

impl NotificationService {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { channels: Arc::new(DashMap::new()), channel_capacity: channel_capacity.max(1), metrics: Metrics::new() }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<DmEvent> {
        let tx = self
            .channels
            .entry(user_id)
            .or_insert_with(|| {
                self.metrics.active_channels.add(1, &[]);
                let (tx, _rx) = broadcast::channel(self.channel_capacity);
                tx
            })
            .value()
            .clone();

        tx.subscribe()
    }

    /// Number of users with an open event channel.
    #[must_use]
    pub fn subscribed_users(&self) -> usize {
        self.channels.len()
    }

    /// Drops the event channel of every user whose last DM subscriber has disconnected.
    /// Returns how many channels were removed.
    pub fn prune_idle_subscriptions(&self) -> usize {
        let start = std::time::Instant::now();
        let mut reclaimed_this_cycle: usize = 0;

        self.channels.retain(|_, sender| {
            let active = sender.receiver_count() > 0;
            if !active {
                self.metrics.active_channels.add(-1, &[]);
                reclaimed_this_cycle += 1;
            }
            active
        });

        let duration = start.elapsed().as_secs_f64();
        self.metrics.gc_duration_seconds.record(duration, &[]);

        if reclaimed_this_cycle > 0 {
            self.metrics.gc_reclaimed_total.add(u64::try_from(reclaimed_this_cycle).unwrap_or(u64::MAX), &[]);
            tracing::info!(reclaimed = reclaimed_this_cycle, "Pruned idle DM event channels");
        }
        tracing::debug!(duration_secs = %duration, "DM channel prune cycle completed");
        reclaimed_this_cycle
    }
}

impl Notifier for NotificationService {
    fn notify(&self, user_id: Uuid, event: DmEvent) {
        if let Some(tx) = self.channels.get(&user_id) {
            // No receivers is not an error for fire-and-forget delivery
            let _ = tx.send(event);
            tracing::trace!(%user_id, ?event, "Dispatched notification to local channel");
            self.metrics.sends_total.add(1, &[KeyValue::new("status", "delivered")]);
        } else {
            tracing::debug!(%user_id, ?event, "No local subscriber for notification");
            self.metrics.sends_total.add(1, &[KeyValue::new("status", "unrouted")]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let service = NotificationService::new(4);
        let user = Uuid::new_v4();
        let mut rx = service.subscribe(user);

        let event = DmEvent::MessageReceived { conversation_id: Uuid::new_v4(), message_id: Uuid::new_v4() };
        service.notify(user, event);

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_notify_without_subscriber_is_silent() {
        let service = NotificationService::new(4);
        service.notify(
            Uuid::new_v4(),
            DmEvent::MessageRead { conversation_id: Uuid::new_v4(), message_id: Uuid::new_v4() },
        );
        assert!(service.channels.is_empty());
    }

    #[test]
    fn test_prune_drops_channels_without_subscribers() {
        let service = NotificationService::new(4);
        let active = Uuid::new_v4();
        let stale = Uuid::new_v4();

        let _rx_active = service.subscribe(active);
        let rx_stale = service.subscribe(stale);
        drop(rx_stale);

        assert_eq!(service.prune_idle_subscriptions(), 1);

        assert_eq!(service.subscribed_users(), 1);
        assert!(service.channels.contains_key(&active));
        assert!(!service.channels.contains_key(&stale));
    }
}
