//! Configuration file support
//!
//! Loads manifest server configuration from sectioned TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{CacheConfig, ManifestConfig, ServerConfig};
use crate::error::Result;

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Playlist cache settings
    pub cache: Option<CacheSettings>,
    /// Synthesized manifest settings
    pub manifest: Option<ManifestSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory holding media descriptions
    pub media_root: PathBuf,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached playlists
    pub max_entries: usize,
    /// TTL for unused media descriptions in seconds
    pub media_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSettings {
    /// `#EXT-X-VERSION` of synthesized playlists
    pub version: Option<u32>,
    /// Emit I-frame playlist entries
    pub include_iframe_playlists: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3000,
                media_root: PathBuf::from("media"),
                cors_enabled: Some(true),
            },
            cache: Some(CacheSettings {
                max_entries: 256,
                media_ttl_secs: Some(300),
            }),
            manifest: Some(ManifestSettings {
                version: Some(4),
                include_iframe_playlists: Some(false),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let cache_defaults = CacheConfig::default();
        let manifest_defaults = ManifestConfig::default();

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            media_root: self.server.media_root,
            cache: self
                .cache
                .map(|c| CacheConfig {
                    max_entries: c.max_entries,
                    media_ttl_secs: c.media_ttl_secs.unwrap_or(cache_defaults.media_ttl_secs),
                })
                .unwrap_or(cache_defaults),
            manifest: self
                .manifest
                .map(|m| ManifestConfig {
                    version: m.version.unwrap_or(manifest_defaults.version),
                    include_iframe_playlists: m
                        .include_iframe_playlists
                        .unwrap_or(manifest_defaults.include_iframe_playlists),
                })
                .unwrap_or(manifest_defaults),
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or_else(|| "info".to_string()),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or_else(|| "pretty".to_string()),
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
