//! Track negotiation module
//!
//! This module activates and keeps active the selected audio and subtitle
//! tracks:
//! - Source swaps with snapshot, probe, readiness deadline and revert
//! - The three-strategy escalation chain for audio, the text track path
//!   for subtitles
//! - Generation-tagged, per-kind serialized selection requests
//! - The drift enforcer that re-asserts a committed track

pub mod coordinator;
pub mod enforcer;
pub mod negotiator;
pub mod strategy;

pub use coordinator::SourceSwitchCoordinator;
pub use enforcer::DriftEnforcer;
pub use negotiator::{TrackNegotiator, TrackSlot};

use serde::Serialize;
use std::fmt;

use crate::catalog::{TrackDescriptor, TrackKind};
use crate::config::NegotiatorConfig;
use crate::error::NegotiationError;
use crate::player::MediaPlayer;

/// Mechanism that activated a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NegotiationMethod {
    /// Track control of the adaptive engine
    NativeEngineApi,
    /// The player's generic track lists
    GenericTrackApi,
    /// Reloading the player with a source that carries the track
    SourceSubstitution,
}

impl NegotiationMethod {
    /// Audio strategies, strongest first
    pub const CHAIN: [NegotiationMethod; 3] = [
        NegotiationMethod::NativeEngineApi,
        NegotiationMethod::GenericTrackApi,
        NegotiationMethod::SourceSubstitution,
    ];

    /// Whether this strategy can be tried for `track` on `player`
    pub fn is_applicable(
        self,
        player: &dyn MediaPlayer,
        track: &TrackDescriptor,
        config: &NegotiatorConfig,
    ) -> bool {
        match self {
            NegotiationMethod::NativeEngineApi => player
                .engine()
                .map(|engine| engine.audio_track_count() > 0)
                .unwrap_or(false),
            NegotiationMethod::GenericTrackApi => player
                .audio_tracks()
                .map(|tracks| !tracks.is_empty())
                .unwrap_or(false),
            NegotiationMethod::SourceSubstitution => {
                config.manifest_template.is_some() || !track.source_locator.trim().is_empty()
            }
        }
    }
}

impl fmt::Display for NegotiationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationMethod::NativeEngineApi => f.write_str("native engine API"),
            NegotiationMethod::GenericTrackApi => f.write_str("generic track API"),
            NegotiationMethod::SourceSubstitution => f.write_str("source substitution"),
        }
    }
}

/// Result of one negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationOutcome {
    pub succeeded: bool,
    pub method_used: Option<NegotiationMethod>,
    pub committed_index: Option<usize>,
    /// Why the negotiation failed, `None` on success
    pub failure: Option<NegotiationError>,
}

impl NegotiationOutcome {
    pub fn success(method: NegotiationMethod, committed_index: Option<usize>) -> Self {
        Self {
            succeeded: true,
            method_used: Some(method),
            committed_index,
            failure: None,
        }
    }

    pub fn failure(error: NegotiationError) -> Self {
        Self {
            succeeded: false,
            method_used: None,
            committed_index: None,
            failure: Some(error),
        }
    }
}

/// Subtitle selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleTarget {
    Track(usize),
    /// Hide all subtitles
    Off,
}

impl From<usize> for SubtitleTarget {
    fn from(index: usize) -> Self {
        SubtitleTarget::Track(index)
    }
}

impl From<Option<usize>> for SubtitleTarget {
    fn from(index: Option<usize>) -> Self {
        index.map(SubtitleTarget::Track).unwrap_or(SubtitleTarget::Off)
    }
}

/// Events published by a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A selection request finished
    Negotiated {
        kind: TrackKind,
        outcome: NegotiationOutcome,
    },
    /// The drift enforcer re-applied the committed track
    Corrected { kind: TrackKind, index: usize },
}
