#![allow(dead_code)]
use chirp_dm::adapters::database::{self, DbPool};
use chirp_dm::api::MgmtState;
use chirp_dm::config::Config;
use chirp_dm::domain::auth::Claims;
use chirp_dm::{AppBuilder, api, run_migrations};
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::Once;
use tokio::net::TcpListener;
use tokio::sync::watch;
use uuid::Uuid;

static INIT: Once = Once::new();

pub const JWT_SECRET: &str = "integration_test_secret";

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("chirp_dm=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// In-memory configuration; extra CLI flags override the defaults.
pub fn get_test_config_with(extra: &[&str]) -> Config {
    config_for_storage("memory", extra)
}

fn config_for_storage(storage: &str, extra: &[&str]) -> Config {
    let mut args = vec![
        "chirp-dm",
        "--storage",
        storage,
        "--jwt-secret",
        JWT_SECRET,
        "--host",
        "127.0.0.1",
        "--port",
        "0",
        "--mgmt-port",
        "0",
        "--typing-cleanup-disabled",
    ];
    args.extend_from_slice(extra);
    Config::try_parse_from(args).unwrap()
}

pub fn get_test_config() -> Config {
    get_test_config_with(&[])
}

/// Postgres configuration pointed at `DATABASE_URL`, or `None` when it is unset.
pub fn get_pg_test_config() -> Option<Config> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    Some(config_for_storage("postgres", &[
        "--database-url",
        &database_url,
        "--db-connect-max-attempts",
        "3",
    ]))
}

pub async fn get_test_pool(config: &Config) -> DbPool {
    let pool = database::init_pool(&config.database).await.expect("Failed to connect to DB. Is Postgres running?");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

#[derive(Debug, Clone, Copy)]
pub struct TestUser {
    pub user_id: Uuid,
}

impl TestUser {
    pub fn token(&self) -> String {
        Claims::new(self.user_id, 3600).encode(JWT_SECRET).unwrap()
    }
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: Client,
    pub config: Config,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        Self::spawn_with_builder(config.clone(), AppBuilder::new(config)).await
    }

    /// Spawns against Postgres. Returns `None` when `DATABASE_URL` is not set so the
    /// suite still runs on machines without a database.
    pub async fn spawn_postgres() -> Option<Self> {
        setup_tracing();
        let Some(config) = get_pg_test_config() else {
            tracing::warn!("DATABASE_URL not set, skipping postgres-backed test");
            return None;
        };
        let pool = get_test_pool(&config).await;
        Some(Self::spawn_with_builder(config.clone(), AppBuilder::new(config).with_database(pool)).await)
    }

    async fn spawn_with_builder(config: Config, builder: AppBuilder) -> Self {
        setup_tracing();

        let app = builder.build().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let _workers = app.workers.spawn_all(shutdown_rx.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let router = api::app_router(config.clone(), app.services);
        let mgmt_router = api::mgmt_router(MgmtState { health_service: app.health_service });

        let mut api_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = api_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });
        let mut mgmt_rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router)
                .with_graceful_shutdown(async move {
                    let _ = mgmt_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        Self { server_url, mgmt_url, client: Client::new(), config, shutdown_tx }
    }

    pub fn new_user(&self) -> TestUser {
        TestUser { user_id: Uuid::new_v4() }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.server_url, path)
    }

    /// Sends an authenticated request and returns the status with the parsed body
    /// (`Value::Null` for empty bodies).
    pub async fn request(
        &self,
        method: reqwest::Method,
        user: &TestUser,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = self.client.request(method, self.url(path)).bearer_auth(user.token());
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let text = resp.text().await.unwrap();
        let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text).unwrap() };
        (status, value)
    }

    pub async fn get(&self, user: &TestUser, path: &str) -> (StatusCode, Value) {
        self.request(reqwest::Method::GET, user, path, None).await
    }

    pub async fn post(&self, user: &TestUser, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(reqwest::Method::POST, user, path, Some(body)).await
    }

    pub async fn create_conversation(&self, user: &TestUser, other: &TestUser) -> Uuid {
        let (status, body) =
            self.post(user, "/conversations", json!({ "participantId": other.user_id })).await;
        assert_eq!(status, StatusCode::OK, "create conversation failed: {body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn send_message(&self, user: &TestUser, conversation_id: Uuid, content: &str) -> Value {
        let (status, body) = self
            .post(user, &format!("/conversations/{conversation_id}/messages"), json!({ "content": content }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "send failed: {body}");
        body
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
