//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Media descriptions loaded from the media root
//! - The rendered playlist cache
//! - Server configuration

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::catalog::{TrackCatalog, TrackInput, TrackInputs};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::http::cache::{PlaylistCache, PlaylistCacheStats};
use crate::playlist::{IFrameVariant, PlaylistSynthesizer, VariantLadder, VideoVariant};

/// File name of a media description inside `<media_root>/<id>/`
pub const MEDIA_DESCRIPTION_FILE: &str = "tracks.json";

/// Everything needed to synthesize the master playlist of one media item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDescription {
    /// Locator the master playlist is served from; track locators resolve
    /// against it
    pub base_locator: String,
    pub variants: Vec<VideoVariant>,
    pub iframe_variants: Vec<IFrameVariant>,
    pub audio: Vec<TrackInput>,
    pub subtitles: Vec<TrackInput>,
}

impl MediaDescription {
    pub fn ladder(&self) -> VariantLadder {
        VariantLadder::new(self.variants.clone(), self.iframe_variants.clone())
    }

    pub fn catalog(&self) -> TrackCatalog {
        TrackCatalog::from_manual(&TrackInputs {
            audio: self.audio.clone(),
            subtitles: self.subtitles.clone(),
        })
    }
}

/// A registered media item
#[derive(Debug)]
pub struct MediaEntry {
    pub media_id: String,
    pub description: MediaDescription,
    pub catalog: TrackCatalog,
    /// Last access time (Unix seconds)
    last_accessed: AtomicU64,
}

impl MediaEntry {
    pub fn new(media_id: &str, description: MediaDescription) -> Self {
        let catalog = description.catalog();
        Self {
            media_id: media_id.to_string(),
            description,
            catalog,
            last_accessed: AtomicU64::new(unix_now()),
        }
    }

    /// Update last access time
    pub fn touch(&self) {
        self.last_accessed.store(unix_now(), Ordering::Relaxed);
    }

    /// Get seconds since last access
    pub fn time_since_last_access(&self) -> u64 {
        unix_now().saturating_sub(self.last_accessed.load(Ordering::Relaxed))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Media ids are single path components
fn valid_media_id(media_id: &str) -> bool {
    !media_id.is_empty()
        && media_id != "."
        && media_id != ".."
        && !media_id.contains(&['/', '\\'][..])
}

/// Application state shared across all handlers
pub struct AppState {
    /// Registered media (media_id -> entry)
    pub media: DashMap<String, Arc<MediaEntry>>,

    /// Rendered master playlists
    pub playlists: PlaylistCache,

    /// Server shutdown flag
    pub shutdown: AtomicBool,

    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            media: DashMap::new(),
            playlists: PlaylistCache::new(&config.cache),
            shutdown: AtomicBool::new(false),
            config,
        }
    }

    /// Create AppState with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Register a media description under `media_id`, replacing any
    /// previous one and its cached playlists
    pub fn register_media(&self, media_id: &str, description: MediaDescription) -> Arc<MediaEntry> {
        let entry = Arc::new(MediaEntry::new(media_id, description));
        self.media.insert(media_id.to_string(), entry.clone());
        self.playlists.remove_media(media_id);
        debug!(
            media_id,
            audio = entry.catalog.audio().len(),
            subtitles = entry.catalog.subtitles().len(),
            "media registered"
        );
        entry
    }

    /// Get a registered media item
    pub fn get_media(&self, media_id: &str) -> Option<Arc<MediaEntry>> {
        self.media.get(media_id).map(|r| r.clone())
    }

    /// Get a media item, loading `<media_root>/<id>/tracks.json` on first use
    pub async fn load_media(&self, media_id: &str) -> Result<Arc<MediaEntry>> {
        if let Some(entry) = self.get_media(media_id) {
            entry.touch();
            return Ok(entry);
        }

        if !valid_media_id(media_id) {
            return Err(Error::MediaNotFound(media_id.to_string()));
        }

        let path = self.description_path(media_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MediaNotFound(media_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let description: MediaDescription = serde_json::from_str(&content)?;

        info!(media_id, path = %path.display(), "loaded media description");
        Ok(self.register_media(media_id, description))
    }

    /// Remove a media item and its cached playlists
    pub fn remove_media(&self, media_id: &str) -> Option<Arc<MediaEntry>> {
        self.playlists.remove_media(media_id);
        self.media.remove(media_id).map(|(_, entry)| entry)
    }

    /// Render (or fetch from cache) the master playlist of a media item
    pub fn master_playlist(&self, entry: &MediaEntry, default_audio: Option<usize>) -> bytes::Bytes {
        if let Some(cached) = self.playlists.get(&entry.media_id, default_audio) {
            return cached;
        }

        let synthesizer = PlaylistSynthesizer::new(entry.description.ladder(), self.config.manifest.clone());
        let playlist = bytes::Bytes::from(synthesizer.synthesize(
            &entry.catalog,
            &entry.description.base_locator,
            default_audio,
        ));
        self.playlists.insert(&entry.media_id, default_audio, playlist.clone());
        playlist
    }

    fn description_path(&self, media_id: &str) -> PathBuf {
        self.config
            .media_root
            .join(media_id)
            .join(MEDIA_DESCRIPTION_FILE)
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> PlaylistCacheStats {
        self.playlists.stats()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown is requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Remove media not accessed within `cache.media_ttl_secs`.
    /// Returns number of removed media items.
    pub fn cleanup_expired_media(&self) -> usize {
        let ttl = self.config.cache.media_ttl_secs;

        let expired: Vec<String> = self
            .media
            .iter()
            .filter(|entry| entry.value().time_since_last_access() > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .iter()
            .filter(|media_id| self.remove_media(media_id).is_some())
            .count()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_defaults()
    }
}
