//! HLS track manifest server
//!
//! Serves synthesized master playlists for the media described under the
//! media root, so players can swap to a manifest that advertises every
//! audio and subtitle track.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hls_track_negotiator::config::ServerConfig;
use hls_track_negotiator::config_file::{generate_default_config, ConfigFile};
use hls_track_negotiator::error::{Error, Result};
use hls_track_negotiator::http::create_router;
use hls_track_negotiator::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "hls-track-server";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let (config, config_error) = load_config(&config_path);

    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = config_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    tracing::info!("Configuration loaded: {:?}", config);

    // Create application state
    let state = Arc::new(AppState::new(config.clone()));
    spawn_media_cleanup(state.clone());

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| Error::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// Load the config file, writing a default one when none exists
fn load_config(path: &str) -> (ServerConfig, Option<Error>) {
    if !Path::new(path).exists() {
        return match generate_default_config(path) {
            Ok(()) => (ServerConfig::default(), None),
            Err(e) => (ServerConfig::default(), Some(e)),
        };
    }

    match ConfigFile::from_file(path) {
        Ok(cf) => (cf.into_server_config(), None),
        Err(e) => (ServerConfig::default(), Some(e)),
    }
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "hls_track_negotiator={},hls_track_server={},tower_http=debug",
            config.log_level, config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically drop media descriptions nobody asked for
fn spawn_media_cleanup(state: Arc<AppState>) {
    let period = Duration::from_secs(state.config.cache.media_ttl_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        while !state.is_shutdown() {
            ticker.tick().await;
            let removed = state.cleanup_expired_media();
            if removed > 0 {
                tracing::debug!(removed, "expired media descriptions dropped");
            }
        }
    });
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    state.shutdown();
}
