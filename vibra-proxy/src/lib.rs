//! vibra-proxy library interface
//!
//! Backend proxy between the VibraAi front end and the upstream music
//! generation API. Exposes the router and state for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod validation;

pub use crate::config::ProxyConfig;
pub use crate::error::{ApiResult, ProxyError};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use vibra_common::ArtistFilter;

use crate::middleware::{
    enforce_api_rate_limit, enforce_rate_limit, sanitize_json_body, with_security_headers,
    RateLimits, MAX_BODY_BYTES,
};
use crate::services::SunoClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    /// Upstream generation API client
    pub upstream: Arc<SunoClient>,
    /// Artist-name filter applied to every free-text field
    pub filter: Arc<ArtistFilter>,
    pub rate_limits: RateLimits,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last upstream error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let upstream = SunoClient::new(&config.upstream_base_url, &config.api_key)?
            .with_pace(config.upstream_requests_per_second);
        let rate_limits = RateLimits::new(config.general_limit, config.generation_limit)?;

        Ok(Self {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
            filter: Arc::new(ArtistFilter::default()),
            rate_limits,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        })
    }

    /// Replace the artist filter (custom deny lists)
    pub fn with_filter(mut self, filter: ArtistFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
///
/// Every path under `/api`, routed or not, shares the general rate limit;
/// generation submit is additionally guarded by the generation limit.
/// Rejected requests never reach a handler.
pub fn build_router(state: AppState) -> Router {
    let generation = Router::new()
        .route(api::GENERATE_MUSIC_PATH, post(api::generate_music))
        .route_layer(axum::middleware::from_fn_with_state(
            state.rate_limits.generation.clone(),
            enforce_rate_limit,
        ));

    let api_routes = Router::new()
        .merge(generation)
        .route(api::RECORD_INFO_PATH, get(api::record_info))
        .route_layer(axum::middleware::from_fn(sanitize_json_body))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let router = Router::new()
        .merge(api::root_routes(&state.config))
        .merge(api_routes)
        .merge(api::health_routes())
        .fallback_service(api::spa_service(&state.config))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state.rate_limits.general.clone(),
            enforce_api_rate_limit,
        ))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http());

    with_security_headers(router, &state.config.upstream_base_url)
}

/// CORS restricted to the configured front-end origin, or open when unset
fn cors_layer(config: &ProxyConfig) -> CorsLayer {
    let origin = match config.frontend_url.as_deref() {
        Some(url) => match url.trim_end_matches('/').parse() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Ignoring unparseable FRONTEND_URL {:?}, allowing any origin", url);
                AllowOrigin::any()
            }
        },
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
