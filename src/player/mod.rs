//! Player boundary
//!
//! This module defines what the negotiator needs from a media player:
//! - The player itself (source, position, play state, events)
//! - The adaptive engine's native audio track control, when exposed
//! - The generic audio and text track lists
//! - Playback snapshots taken around source swaps
//!
//! A host binds these traits to its actual player.

pub mod probe;

pub use probe::{HttpProbe, LocatorProbe};

use tokio::sync::broadcast;

/// Events a player publishes to the negotiator
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Metadata of the current source is loaded
    MetadataReady,
    /// The player failed to load or play the current source
    Error(String),
    FullscreenChange,
    /// Tracks were added, removed or changed state
    TrackListChange,
}

/// A media player attached to one session
pub trait MediaPlayer: Send + Sync {
    /// Locator of the current source
    fn source(&self) -> String;

    /// Load a new source. Readiness is signalled through
    /// [`PlayerEvent::MetadataReady`].
    fn set_source(&self, locator: &str);

    fn position(&self) -> f64;

    fn seek(&self, position_secs: f64);

    fn is_playing(&self) -> bool;

    fn play(&self);

    fn pause(&self);

    /// Subscribe to player events
    fn events(&self) -> broadcast::Receiver<PlayerEvent>;

    /// Native track control of the adaptive engine, if the engine exposes one
    fn engine(&self) -> Option<&dyn EngineTrackControl>;

    /// Generic audio track list, if the player has one
    fn audio_tracks(&self) -> Option<&dyn TrackList>;

    fn text_tracks(&self) -> &dyn TextTrackList;
}

/// Audio track control of the adaptive streaming engine
pub trait EngineTrackControl: Send + Sync {
    fn audio_track_count(&self) -> usize;

    fn is_audio_track_enabled(&self, index: usize) -> bool;

    fn set_audio_track_enabled(&self, index: usize, enabled: bool);

    /// Tell the engine the active audio track changed
    fn notify_track_switched(&self, index: usize);

    /// Restart segment loading from the current position
    fn restart_loading(&self);

    fn enabled_audio_track(&self) -> Option<usize> {
        (0..self.audio_track_count()).find(|&i| self.is_audio_track_enabled(i))
    }
}

/// Generic audio track list of the player
pub trait TrackList: Send + Sync {
    fn len(&self) -> usize;

    fn is_enabled(&self, index: usize) -> bool;

    fn set_enabled(&self, index: usize, enabled: bool);

    /// Fire the list's change notification
    fn notify_change(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enabled_index(&self) -> Option<usize> {
        (0..self.len()).find(|&i| self.is_enabled(i))
    }
}

/// Kind of a text track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTrackKind {
    Subtitles,
    Captions,
    Descriptions,
    Chapters,
    Metadata,
}

impl TextTrackKind {
    /// Subtitle and caption tracks are the ones the catalog maps onto
    pub fn is_subtitle(self) -> bool {
        matches!(self, TextTrackKind::Subtitles | TextTrackKind::Captions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTrackMode {
    Disabled,
    Hidden,
    Showing,
}

/// Text track list of the player
pub trait TextTrackList: Send + Sync {
    fn len(&self) -> usize;

    fn kind(&self, index: usize) -> TextTrackKind;

    fn mode(&self, index: usize) -> TextTrackMode;

    fn set_mode(&self, index: usize, mode: TextTrackMode);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw index of the first showing text track
    fn showing_index(&self) -> Option<usize> {
        (0..self.len()).find(|&i| self.mode(i) == TextTrackMode::Showing)
    }

    /// Raw indices of the subtitle and caption tracks, in order. Position
    /// `n` of this list is subtitle catalog index `n`.
    fn subtitle_positions(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.kind(i).is_subtitle())
            .collect()
    }

    /// Catalog index of the showing subtitle track
    fn showing_subtitle(&self) -> Option<usize> {
        self.subtitle_positions()
            .iter()
            .position(|&i| self.mode(i) == TextTrackMode::Showing)
    }
}

/// Playback state captured right before a forced source swap
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub position_secs: f64,
    pub is_playing: bool,
    /// Raw text track index that was showing
    pub active_subtitle_index: Option<usize>,
}

impl PlaybackSnapshot {
    pub fn capture(player: &dyn MediaPlayer) -> Self {
        Self {
            position_secs: player.position().max(0.0),
            is_playing: player.is_playing(),
            active_subtitle_index: player.text_tracks().showing_index(),
        }
    }

    /// Put the player back into the captured state. Consumes the snapshot.
    pub fn restore(self, player: &dyn MediaPlayer) {
        player.seek(self.position_secs);

        if let Some(index) = self.active_subtitle_index {
            let text_tracks = player.text_tracks();
            if index < text_tracks.len() {
                text_tracks.set_mode(index, TextTrackMode::Showing);
            }
        }

        if self.is_playing {
            player.play();
        }
    }
}
