//! vibra-proxy - backend proxy for the VibraAi music generator
//!
//! Keeps the upstream API key server-side, strips artist names from
//! generation prompts, rate limits callers and serves the front end.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vibra_common::config::{env_non_empty, load_toml_config};
use vibra_proxy::config::{ConfigOverrides, ProxyFileConfig, API_KEY_ENV};
use vibra_proxy::{build_router, AppState, ProxyConfig};

/// Idle rate-limiter entries are purged this often
const LIMITER_HOUSEKEEPING_SECS: u64 = 60;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "vibra-proxy")]
#[command(about = "Backend proxy for the VibraAi music generator")]
#[command(version)]
struct Args {
    /// HTTP port to listen on (default 3001)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Front-end origin allowed by CORS (any origin when unset)
    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<String>,

    /// Upstream generation API base URL
    #[arg(long, env = "SUNO_API_BASE_URL")]
    upstream_url: Option<String>,

    /// Directory of static front-end files
    #[arg(long, env = "VIBRA_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Config file (default ~/.config/vibra/vibra-proxy.toml)
    #[arg(short, long, env = "VIBRA_PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibra_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before anything can fail
    info!(
        "Starting VibraAi proxy (vibra-proxy) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let file_config: ProxyFileConfig = load_toml_config(args.config.as_deref(), "vibra-proxy")
        .context("Failed to load configuration file")?;

    let overrides = ConfigOverrides {
        port: args.port,
        frontend_url: args.frontend_url,
        upstream_url: args.upstream_url,
        static_dir: args.static_dir,
    };

    let config = match ProxyConfig::resolve(env_non_empty(API_KEY_ENV), overrides, file_config) {
        Ok(config) => config,
        Err(e) => {
            error!("ERRO: {} não está configurada. Defina a variável de ambiente antes de iniciar.", API_KEY_ENV);
            return Err(e).context("Refusing to start without an upstream API key");
        }
    };

    info!(
        "Upstream API: {} (max {} calls/s)",
        config.upstream_base_url, config.upstream_requests_per_second
    );
    match &config.frontend_url {
        Some(origin) => info!("CORS origin: {}", origin),
        None => info!("CORS origin: any"),
    }
    info!(
        "Rate limits: {}/{}s general, {}/{}s generation",
        config.general_limit.max_requests,
        config.general_limit.window.as_secs(),
        config.generation_limit.max_requests,
        config.generation_limit.window.as_secs()
    );

    let port = config.port;
    let state = AppState::new(config).context("Failed to initialize application state")?;
    let housekeeping = state
        .rate_limits
        .spawn_housekeeping(Duration::from_secs(LIMITER_HOUSEKEEPING_SECS));

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("vibra-proxy listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    housekeeping.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
