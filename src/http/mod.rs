//! HTTP server module
//!
//! This module serves synthesized master playlists:
//! - Axum router with manifest and debug endpoints
//! - Request handlers and HTTP error mapping
//! - LRU cache of rendered playlists
//! - HTTP headers (Content-Type, Cache-Control)
//! - CORS middleware

pub mod cache;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
