//! HTTP request handlers
//!
//! Implements handlers for the manifest endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Error;
use crate::playlist::PLAYLIST_MIME_TYPE;
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    MediaNotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::MediaNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Media not found: {}", id))
            }
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        match err {
            Error::MediaNotFound(id) => HttpError::MediaNotFound(id),
            Error::Json(e) => HttpError::InternalError(format!("Invalid media description: {}", e)),
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

/// Query of the master playlist endpoint
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistQuery {
    /// Audio track to mark `DEFAULT=YES`
    pub audio: Option<usize>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("hls-track-server v", env!("CARGO_PKG_VERSION"))
}

/// Master playlist endpoint
/// GET|HEAD /{id}/master.m3u8?audio=N
pub async fn master_playlist(
    State(state): State<Arc<AppState>>,
    Path(media_id): Path<String>,
    Query(query): Query<PlaylistQuery>,
) -> Result<Response, HttpError> {
    let entry = state.load_media(&media_id).await?;

    if let Some(audio) = query.audio {
        let available = entry.catalog.audio().len();
        if audio >= available {
            return Err(HttpError::BadRequest(format!(
                "Audio track {} out of range ({} available)",
                audio, available
            )));
        }
    }

    let playlist = state.master_playlist(&entry, query.audio);
    debug!(media_id, audio = ?query.audio, bytes = playlist.len(), "serving master playlist");

    let mut headers = HeaderMap::new();
    headers.insert(
        "Content-Type",
        HeaderValue::from_static(PLAYLIST_MIME_TYPE),
    );
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

    Ok((headers, playlist).into_response())
}

/// Debug endpoint - playlist cache
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.cache_stats()))
}

/// Debug endpoint - registered media
pub async fn registered_media(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let media: Vec<_> = state
        .media
        .iter()
        .map(|r| {
            serde_json::json!({
                "media_id": r.media_id,
                "base_locator": r.description.base_locator,
                "variants": r.description.variants.len(),
                "audio": r.catalog.audio(),
                "subtitles": r.catalog.subtitles(),
                "idle_secs": r.time_since_last_access(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": media.len(),
        "media": media,
    }))
}
