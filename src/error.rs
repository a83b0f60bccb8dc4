use thiserror::Error;

use crate::catalog::TrackKind;
use crate::negotiate::NegotiationMethod;

/// Main error type for configuration, I/O and the manifest service
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization failed: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Media not found: {0}")]
    MediaNotFound(String),

    #[error("Playlist generation error: {0}")]
    Playlist(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),
}

/// Failures of a single negotiation, source swap or strategy.
///
/// Strategy-level variants are recovered inside the negotiator by falling
/// through to the next strategy; only `CatalogEmpty`, `IndexOutOfRange` and
/// `StrategyExhausted` reach a caller through a `NegotiationOutcome`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("No {0} tracks in catalog")]
    CatalogEmpty(TrackKind),

    #[error("{kind} track {index} is not in the catalog ({available} available)")]
    IndexOutOfRange {
        kind: TrackKind,
        index: usize,
        available: usize,
    },

    #[error("Locator unreachable: {0}")]
    UnreachableLocator(String),

    #[error("No readiness signal for {locator} within {timeout_ms} ms")]
    ReadinessTimeout { locator: String, timeout_ms: u64 },

    #[error("Player reported error: {0}")]
    PlayerError(String),

    #[error("{0} is not available on this player")]
    StrategyUnavailable(NegotiationMethod),

    #[error("All strategies failed for {kind} track {index}")]
    StrategyExhausted { kind: TrackKind, index: usize },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
