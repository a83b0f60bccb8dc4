//! Negotiator, manifest and server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Track negotiation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Drift enforcer poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Deadline for the "metadata ready" signal after a source swap
    pub readiness_timeout_ms: u64,

    /// Timeout for the reachability probe before a swap
    pub probe_timeout_ms: u64,

    /// Forward offset of the micro-seek that forces a pipeline re-evaluation
    pub micro_seek_epsilon_secs: f64,

    /// Delay between the forward micro-seek and the seek back
    pub micro_seek_settle_ms: u64,

    /// Number of checks while waiting for the engine to enumerate tracks
    pub discovery_attempts: u32,

    /// Delay between discovery checks
    pub discovery_interval_ms: u64,

    /// Also run a drift enforcer for the subtitle selection
    pub enforce_subtitles: bool,

    /// Locator of a synthesized master playlist; `{index}` is replaced with
    /// the audio track made default. Used by source substitution when set.
    pub manifest_template: Option<String>,

    /// Language picked by the initial selection when present in the catalog
    pub preferred_audio_language: Option<String>,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            readiness_timeout_ms: 5000,
            probe_timeout_ms: 3000,
            micro_seek_epsilon_secs: 0.1,
            micro_seek_settle_ms: 300,
            discovery_attempts: 20,
            discovery_interval_ms: 500,
            enforce_subtitles: false,
            manifest_template: None,
            preferred_audio_language: None,
        }
    }
}

impl NegotiatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn micro_seek_settle(&self) -> Duration {
        Duration::from_millis(self.micro_seek_settle_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    /// Resolve `manifest_template` for a given default audio index
    pub fn manifest_locator(&self, audio_index: usize) -> Option<String> {
        self.manifest_template
            .as_ref()
            .map(|t| t.replace("{index}", &audio_index.to_string()))
    }
}

/// Synthesized manifest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Value of `#EXT-X-VERSION`
    pub version: u32,

    /// Emit `#EXT-X-I-FRAME-STREAM-INF` entries from the variant ladder
    pub include_iframe_playlists: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            version: 4,
            include_iframe_playlists: false,
        }
    }
}

/// Cache configuration for synthesized playlists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached playlists
    pub max_entries: usize,

    /// Seconds after which an unused media description is dropped
    pub media_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            media_ttl_secs: 300,
        }
    }
}

/// Manifest server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory holding `<id>/tracks.json` media descriptions
    pub media_root: PathBuf,

    /// Playlist cache configuration
    pub cache: CacheConfig,

    /// Synthesized manifest configuration
    pub manifest: ManifestConfig,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            media_root: PathBuf::from("media"),
            cache: CacheConfig::default(),
            manifest: ManifestConfig::default(),
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
