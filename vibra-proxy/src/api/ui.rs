//! Static front-end serving
//!
//! Files under the static directory are served as-is; any other GET gets the
//! index document so client-side routes resolve.

use axum::{http::StatusCode, routing::head, Router};
use tower_http::services::{ServeDir, ServeFile};

use crate::config::ProxyConfig;
use crate::AppState;

/// HEAD / (liveness check)
pub async fn root_head() -> StatusCode {
    StatusCode::OK
}

/// Static file service with index fallback
pub fn spa_service(config: &ProxyConfig) -> ServeDir<ServeFile> {
    ServeDir::new(&config.static_dir).fallback(ServeFile::new(&config.index_file))
}

/// `/` route: HEAD answers 200 directly, GET serves the front end
pub fn root_routes(config: &ProxyConfig) -> Router<AppState> {
    Router::new().route("/", head(root_head).fallback_service(spa_service(config)))
}
