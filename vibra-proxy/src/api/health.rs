//! `GET /health`: liveness plus a snapshot of proxy state

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::middleware::security_headers::origin_of;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Origin requests are proxied to
    pub upstream: String,
    pub rate_limits: RateLimitSnapshot,
    /// Most recent upstream failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Callers each policy currently remembers
#[derive(Debug, Serialize)]
pub struct RateLimitSnapshot {
    pub general_callers: usize,
    pub generation_callers: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    Json(HealthResponse {
        status: "ok",
        module: "vibra-proxy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        upstream: origin_of(state.upstream.base_url()),
        rate_limits: RateLimitSnapshot {
            general_callers: state.rate_limits.general.tracked_callers(),
            generation_callers: state.rate_limits.generation.tracked_callers(),
        },
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
