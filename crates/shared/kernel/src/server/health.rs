use super::ApiState;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::{Json, response::IntoResponse};
use parley_derive::{api_handler, api_model};
use parley_domain::constants::SYSTEM_TAG;
use std::sync::LazyLock;
use std::time::Instant;

#[api_model]
/// Health check response
pub struct HealthResponse {
    /// `up` when storage answers, `degraded` otherwise
    pub status: String,
    /// Version
    pub version: String,
    /// Uptime in seconds
    pub uptime: u64,
    /// Live subscription streams
    pub subscribers: usize,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[api_handler(
    get,
    path = "/health",
    responses(
        (status = OK, description = "Service and storage are up", body = HealthResponse),
        (status = SERVICE_UNAVAILABLE, description = "Storage does not answer", body = HealthResponse),
    ),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let storage = state.database.ping().await;
    if let Err(err) = &storage {
        tracing::warn!(error = %err, "Health check: storage unreachable");
    }

    let body = HealthResponse {
        status: if storage.is_ok() { "up" } else { "degraded" }.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        uptime: START_TIME.elapsed().as_secs(),
        subscribers: state.subscriptions.total(),
    };
    let status = if storage.is_ok() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}
