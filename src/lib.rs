#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::database::{DbPool, PgStore};
use crate::adapters::memory::InMemoryStore;
use crate::adapters::store::Stores;
use crate::api::ServiceContainer;
use crate::config::{Config, StorageBackend};
use crate::domain::attachment::AttachmentPolicy;
use crate::domain::clock::{Clock, SystemClock};
use crate::services::attachment_service::AttachmentService;
use crate::services::block_service::BlockService;
use crate::services::conversation_service::ConversationService;
use crate::services::health_service::HealthService;
use crate::services::message_service::MessageService;
use crate::services::notification_service::NotificationService;
use crate::services::typing_service::TypingService;
use crate::workers::{SubscriberPruneWorker, TypingCleanupWorker};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background workers, built but not yet running.
#[derive(Debug)]
pub struct Workers {
    typing_cleanup: Option<TypingCleanupWorker>,
    subscriber_prune: SubscriberPruneWorker,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(2);
        if let Some(worker) = self.typing_cleanup {
            tasks.push(tokio::spawn(worker.run(shutdown_rx.clone())));
        }
        tasks.push(tokio::spawn(self.subscriber_prune.run(shutdown_rx)));
        tasks
    }
}

/// A fully wired application: request-facing services, the health service
/// and the workers that support them.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub workers: Workers,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    pool: Option<DbPool>,
    clock: Arc<dyn Clock>,
}

impl AppBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, pool: None, clock: Arc::new(SystemClock) }
    }

    /// Backs every store with Postgres. Without a pool the in-memory store is used.
    #[must_use]
    pub fn with_database(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wires stores, services and workers.
    ///
    /// # Errors
    /// Returns an error if the Postgres backend is selected but no pool was supplied.
    pub fn build(self) -> anyhow::Result<App> {
        let config = self.config;
        let clock = self.clock;

        let stores = match (config.storage, &self.pool) {
            (StorageBackend::Postgres, Some(pool)) => Stores::from_backend(Arc::new(PgStore::new(pool.clone()))),
            (StorageBackend::Postgres, None) => {
                anyhow::bail!("postgres storage selected but no database pool was provided")
            }
            (StorageBackend::Memory, _) => Stores::from_backend(Arc::new(InMemoryStore::new())),
        };

        let notification_service = NotificationService::new(config.notifications.channel_capacity);

        let conversation_service = ConversationService::new(
            Arc::clone(&stores.conversations),
            Arc::clone(&stores.messages),
            Arc::clone(&stores.blocks),
            Arc::clone(&clock),
        );
        let message_service = MessageService::new(
            conversation_service.clone(),
            Arc::clone(&stores.messages),
            Arc::new(notification_service.clone()),
            Arc::clone(&clock),
            config.messaging.clone(),
        );
        let typing_ttl = time::Duration::milliseconds(i64::try_from(config.typing.ttl_ms).unwrap_or(i64::MAX));
        let typing_service = TypingService::new(
            conversation_service.clone(),
            Arc::clone(&stores.typing),
            Arc::clone(&clock),
            typing_ttl,
        );
        let block_service = BlockService::new(Arc::clone(&stores.blocks), Arc::clone(&clock));
        let attachment_service = AttachmentService::new(
            conversation_service.clone(),
            Arc::clone(&stores.messages),
            Arc::clone(&stores.attachments),
            AttachmentPolicy {
                max_size_bytes: config.attachments.max_size_bytes,
                reject_unknown_types: config.attachments.reject_unknown_types,
            },
            clock,
        );

        let health_service = HealthService::new(self.pool, config.server.health_db_timeout_ms);

        let typing_cleanup = (!config.typing.cleanup_disabled)
            .then(|| TypingCleanupWorker::new(typing_service.clone(), config.typing.cleanup_interval_secs));
        let subscriber_prune =
            SubscriberPruneWorker::new(notification_service.clone(), config.notifications.gc_interval_secs);

        Ok(App {
            services: ServiceContainer {
                conversation_service,
                message_service,
                typing_service,
                block_service,
                attachment_service,
            },
            health_service,
            workers: Workers { typing_cleanup, subscriber_prune },
        })
    }
}

/// Applies embedded migrations.
///
/// # Errors
/// Returns an error if a migration fails.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Routes panics through tracing so they reach structured logs.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        let location = panic_info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic.message = %message, panic.location = %location, "Process panicked");
    }));
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, draining...");
        let _ = shutdown_tx.send(true);
    });
}
