use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Backend used to persist conversations and messages
    #[arg(long, env = "CHIRP_STORAGE", value_enum, default_value_t = StorageBackend::Postgres)]
    pub storage: StorageBackend,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub messaging: MessagingConfig,

    #[command(flatten)]
    pub typing: TypingConfig,

    #[command(flatten)]
    pub attachments: AttachmentConfig,

    #[command(flatten)]
    pub notifications: NotificationConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long = "database-url", env = "CHIRP_DATABASE_URL", default_value = "postgres://localhost/chirp")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long = "db-max-connections", env = "CHIRP_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long = "db-min-connections", env = "CHIRP_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection before failing a request
    #[arg(long = "db-acquire-timeout-secs", env = "CHIRP_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    /// Seconds an idle connection is kept before being closed
    #[arg(long = "db-idle-timeout-secs", env = "CHIRP_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    /// Maximum lifetime of a single connection in seconds
    #[arg(long = "db-max-lifetime-secs", env = "CHIRP_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,

    /// Minimum backoff between connection attempts at boot
    #[arg(long = "db-connect-min-backoff-ms", env = "CHIRP_DB_CONNECT_MIN_BACKOFF_MS", default_value_t = 250)]
    pub connect_min_backoff_ms: u64,

    /// Maximum backoff between connection attempts at boot
    #[arg(long = "db-connect-max-backoff-secs", env = "CHIRP_DB_CONNECT_MAX_BACKOFF_SECS", default_value_t = 10)]
    pub connect_max_backoff_secs: u64,

    /// Number of connection attempts before giving up at boot
    #[arg(long = "db-connect-max-attempts", env = "CHIRP_DB_CONNECT_MAX_ATTEMPTS", default_value_t = 8)]
    pub connect_max_attempts: usize,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "CHIRP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CHIRP_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health) server
    #[arg(long, env = "CHIRP_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Upper bound on the time spent handling a single request
    #[arg(long, env = "CHIRP_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Time to wait for background tasks on shutdown
    #[arg(long, env = "CHIRP_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Time budget for the readiness probe's database check
    #[arg(long, env = "CHIRP_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub health_db_timeout_ms: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Shared secret used to verify identity tokens issued by the identity service
    #[arg(long, env = "CHIRP_JWT_SECRET")]
    pub jwt_secret: String,
}

#[derive(Clone, Debug, Args)]
pub struct MessagingConfig {
    /// Maximum message length in characters
    #[arg(long, env = "CHIRP_MAX_CONTENT_CHARS", default_value_t = 5000)]
    pub max_content_chars: usize,

    /// Timeline page size used when the caller does not ask for one
    #[arg(long, env = "CHIRP_DEFAULT_PAGE_SIZE", default_value_t = 50)]
    pub default_page_size: i64,

    /// Largest timeline page a caller may request
    #[arg(long, env = "CHIRP_MAX_PAGE_SIZE", default_value_t = 100)]
    pub max_page_size: i64,
}

#[derive(Clone, Debug, Args)]
pub struct TypingConfig {
    /// How long a typing ping stays active
    #[arg(long = "typing-ttl-ms", env = "CHIRP_TYPING_TTL_MS", default_value_t = 3000)]
    pub ttl_ms: u64,

    /// How often expired typing rows are reclaimed
    #[arg(long = "typing-cleanup-interval-secs", env = "CHIRP_TYPING_CLEANUP_INTERVAL_SECS", default_value_t = 60)]
    pub cleanup_interval_secs: u64,

    /// Disable the reclamation worker entirely
    #[arg(long = "typing-cleanup-disabled", env = "CHIRP_TYPING_CLEANUP_DISABLED", default_value_t = false)]
    pub cleanup_disabled: bool,
}

#[derive(Clone, Debug, Args)]
pub struct AttachmentConfig {
    /// Max attachment size in bytes (Default: 10MiB)
    #[arg(long = "attachment-max-size-bytes", env = "CHIRP_ATTACHMENT_MAX_SIZE_BYTES", default_value_t = 10_485_760)]
    pub max_size_bytes: u64,

    /// Reject files whose MIME type cannot be resolved from their name
    #[arg(long = "attachment-reject-unknown-types", env = "CHIRP_ATTACHMENT_REJECT_UNKNOWN_TYPES", default_value_t = false)]
    pub reject_unknown_types: bool,
}

#[derive(Clone, Debug, Args)]
pub struct NotificationConfig {
    /// How often to run the notification garbage collection
    #[arg(long, env = "CHIRP_NOTIFICATION_GC_INTERVAL_SECS", default_value_t = 60)]
    pub gc_interval_secs: u64,

    /// Capacity of each per-user notification channel
    #[arg(long, env = "CHIRP_NOTIFICATION_CHANNEL_CAPACITY", default_value_t = 16)]
    pub channel_capacity: usize,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; telemetry export is disabled when unset
    #[arg(long, env = "CHIRP_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "CHIRP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
