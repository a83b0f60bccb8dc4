//! Track catalog module
//!
//! This module holds the per-session catalog of audio and subtitle tracks:
//! - Track descriptors and their origin (manual or adaptive-discovered)
//! - Merging and de-duplication of track inputs
//! - Display names for language codes

pub mod language;
pub mod store;

pub use store::TrackCatalog;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a selectable track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Subtitle,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Subtitle => f.write_str("subtitle"),
        }
    }
}

/// Where a track descriptor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOrigin {
    /// Supplied by the host alongside the media
    Manual,
    /// Discovered from the adaptive stream's own signaling
    AdaptiveGenerated,
}

/// One selectable track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub kind: TrackKind,
    /// Position within its kind, stable for the session
    pub index: usize,
    /// User-facing identity
    pub label: String,
    /// Language code, may be empty
    pub language: String,
    pub source_locator: String,
    pub origin: TrackOrigin,
}

impl TrackDescriptor {
    /// De-duplication key
    pub fn identity(&self) -> (&str, &str) {
        (&self.label, &self.language)
    }
}

/// Raw track record as supplied by a host or a media description.
///
/// All fields are required; records missing one are skipped by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInput {
    pub src: Option<String>,
    pub srclang: Option<String>,
    pub label: Option<String>,
}

impl TrackInput {
    pub fn new(src: &str, srclang: &str, label: &str) -> Self {
        Self {
            src: Some(src.to_string()),
            srclang: Some(srclang.to_string()),
            label: Some(label.to_string()),
        }
    }

    /// Returns `(src, srclang, label)` when the record is complete.
    ///
    /// `srclang` may be empty; a blank `src` or `label` counts as missing.
    pub fn fields(&self) -> Option<(&str, &str, &str)> {
        let src = self.src.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let srclang = self.srclang.as_deref().map(str::trim)?;
        let label = self.label.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((src, srclang, label))
    }
}

/// Track inputs of both kinds from one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackInputs {
    pub audio: Vec<TrackInput>,
    pub subtitles: Vec<TrackInput>,
}

impl TrackInputs {
    pub fn of_kind(&self, kind: TrackKind) -> &[TrackInput] {
        match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Subtitle => &self.subtitles,
        }
    }
}
