use crate::api::MgmtState;
use crate::api::schemas::health::ReadinessResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe. The in-memory backend is always ready; Postgres must answer within the timeout.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let storage = state.health_service.storage_backend();
    let database = match state.health_service.check_db().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, component = "database", "Readiness probe failed");
            "error"
        }
    };
    let ready = database == "ok";

    let response = ReadinessResponse {
        status: if ready { "ok" } else { "error" },
        storage,
        database: (storage == "postgres").then_some(database),
    };
    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (status_code, Json(response))
}
