pub mod attachment_repo;
pub mod block_repo;
pub mod conversation_repo;
pub mod message_repo;
pub mod pg_store;
pub mod receipt_repo;
pub mod records;
pub mod typing_repo;

pub use pg_store::PgStore;

use crate::config::DatabaseConfig;
use backon::{ExponentialBuilder, Retryable};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool, retrying with exponential
/// backoff while the database comes up.
///
/// # Errors
/// Returns `sqlx::Error` if every connection attempt fails.
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let retry_strategy = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.connect_min_backoff_ms))
        .with_max_delay(Duration::from_secs(config.connect_max_backoff_secs))
        .with_max_times(config.connect_max_attempts);

    let connect = || async {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.url)
            .await
    };

    connect
        .retry(retry_strategy)
        .when(|e| !matches!(e, sqlx::Error::Configuration(_)))
        .notify(|e, duration| {
            tracing::warn!(error = %e, retry_in = ?duration, "Database connection failed, retrying...");
        })
        .await
}
