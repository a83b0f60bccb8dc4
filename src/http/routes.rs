//! Axum router configuration

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{cache_stats, health_check, master_playlist, registered_media, version_check};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors_enabled = state.config.cors_enabled;

    let router = Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Debug endpoints
        .route("/debug/media", get(registered_media))
        .route("/debug/cache", get(cache_stats))
        // GET also answers HEAD, with the body stripped
        .route("/{id}/master.m3u8", get(master_playlist))
        .layer(TraceLayer::new_for_http());

    let router = if cors_enabled {
        // Players are often served from another origin or a private network
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS, Method::HEAD])
            .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
            .allow_private_network(true)
            .max_age(Duration::from_secs(3600));
        router.layer(cors)
    } else {
        router
    };

    router.with_state(state)
}
