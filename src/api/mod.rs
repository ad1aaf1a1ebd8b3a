use crate::config::Config;
use crate::services::attachment_service::AttachmentService;
use crate::services::block_service::BlockService;
use crate::services::conversation_service::ConversationService;
use crate::services::health_service::HealthService;
use crate::services::message_service::MessageService;
use crate::services::typing_service::TypingService;
use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode};
use axum::{
    Router,
    routing::{get, patch, post, put},
};
use std::time::Duration;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod attachments;
pub mod blocks;
pub mod conversations;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod schemas;
pub mod typing;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
    pub typing_service: TypingService,
    pub block_service: BlockService,
    pub attachment_service: AttachmentService,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
    pub typing_service: TypingService,
    pub block_service: BlockService,
    pub attachment_service: AttachmentService,
}

/// Configures and returns the primary application router.
pub fn app_router(config: Config, services: ServiceContainer) -> Router {
    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);

    let state = AppState {
        config,
        conversation_service: services.conversation_service,
        message_service: services.message_service,
        typing_service: services.typing_service,
        block_service: services.block_service,
        attachment_service: services.attachment_service,
    };

    let conversation_routes = Router::new()
        .route("/conversations", post(conversations::create_conversation).get(conversations::list_conversations))
        .route("/conversations/{id}", get(conversations::get_conversation))
        .route("/conversations/{id}/archive", post(conversations::archive).delete(conversations::unarchive))
        .route("/conversations/{id}/mute", post(conversations::mute).delete(conversations::unmute))
        .route("/conversations/{id}/block", post(conversations::block).delete(conversations::unblock))
        .route("/conversations/{id}/unread", get(conversations::unread_count))
        .route("/conversations/{id}/messages", get(messages::timeline).post(messages::send_message))
        .route("/conversations/{id}/read", post(messages::mark_conversation_read))
        .route("/conversations/{id}/typing", put(typing::ping).get(typing::active_typists));

    let message_routes = Router::new()
        .route("/users/{id}/messages", post(messages::send_to_user))
        .route("/messages/{id}", patch(messages::edit_message).delete(messages::delete_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/messages/{id}/receipts", get(messages::receipts))
        .route("/messages/{id}/attachments", post(attachments::attach).get(attachments::list_attachments));

    let block_routes = Router::new()
        .route("/blocks", get(blocks::list_blocks))
        .route("/blocks/{id}", put(blocks::block_user).delete(blocks::unblock_user));

    Router::new()
        .nest("/v1", conversation_routes.merge(message_routes).merge(block_routes))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), middleware::MakeRequestUuidV7))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
