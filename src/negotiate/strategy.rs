//! Track activation strategies
//!
//! Strategy A drives the adaptive engine's own audio track control,
//! Strategy B the player's generic audio track list. Subtitles only have
//! the text track path. Source substitution lives with the negotiator since
//! it needs the coordinator.

use std::time::Duration;

use tracing::{debug, trace};

use crate::catalog::TrackKind;
use crate::error::NegotiationError;
use crate::player::{MediaPlayer, TextTrackMode};

use super::{NegotiationMethod, SubtitleTarget};

/// Seek forward and back to make the pipeline pick up a new audio track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicroSeek {
    pub epsilon_secs: f64,
    pub settle: Duration,
}

/// Strategy A: enable `index` through the engine, disable the rest.
pub fn apply_native(player: &dyn MediaPlayer, index: usize) -> Result<(), NegotiationError> {
    let engine = player.engine().ok_or(NegotiationError::StrategyUnavailable(
        NegotiationMethod::NativeEngineApi,
    ))?;

    let count = engine.audio_track_count();
    if index >= count {
        return Err(NegotiationError::IndexOutOfRange {
            kind: TrackKind::Audio,
            index,
            available: count,
        });
    }

    for i in 0..count {
        engine.set_audio_track_enabled(i, false);
    }
    engine.set_audio_track_enabled(index, true);
    engine.notify_track_switched(index);
    engine.restart_loading();

    trace!(index, "engine audio track enabled");
    Ok(())
}

/// Strategy B: enable `index` in the generic audio track list.
///
/// With `micro_seek` set, the position is nudged forward and back so the
/// pipeline switches right away; corrections pass `None`.
pub async fn apply_generic(
    player: &dyn MediaPlayer,
    index: usize,
    micro_seek: Option<MicroSeek>,
) -> Result<(), NegotiationError> {
    {
        let tracks = player.audio_tracks().ok_or(NegotiationError::StrategyUnavailable(
            NegotiationMethod::GenericTrackApi,
        ))?;

        let count = tracks.len();
        if index >= count {
            return Err(NegotiationError::IndexOutOfRange {
                kind: TrackKind::Audio,
                index,
                available: count,
            });
        }

        for i in 0..count {
            tracks.set_enabled(i, false);
        }
        tracks.set_enabled(index, true);
        tracks.notify_change();
    }

    if let Some(seek) = micro_seek {
        let position = player.position();
        let was_playing = player.is_playing();

        player.seek(position + seek.epsilon_secs);
        tokio::time::sleep(seek.settle).await;
        player.seek(position);
        if was_playing {
            player.play();
        }
        debug!(index, position, "micro-seek done");
    }

    Ok(())
}

/// Text track path: hide every subtitle and caption track, then show the
/// target.
pub fn apply_text_track(player: &dyn MediaPlayer, target: SubtitleTarget) -> Result<(), NegotiationError> {
    let text_tracks = player.text_tracks();
    let positions = text_tracks.subtitle_positions();

    let show = match target {
        SubtitleTarget::Off => None,
        SubtitleTarget::Track(index) => Some(*positions.get(index).ok_or(
            NegotiationError::IndexOutOfRange {
                kind: TrackKind::Subtitle,
                index,
                available: positions.len(),
            },
        )?),
    };

    for &raw in &positions {
        text_tracks.set_mode(raw, TextTrackMode::Disabled);
    }
    if let Some(raw) = show {
        text_tracks.set_mode(raw, TextTrackMode::Showing);
    }

    Ok(())
}

/// Audio track currently enabled, preferring the engine's view
pub fn active_audio(player: &dyn MediaPlayer) -> Option<usize> {
    if let Some(engine) = player.engine() {
        if engine.audio_track_count() > 0 {
            return engine.enabled_audio_track();
        }
    }
    player.audio_tracks().and_then(|tracks| tracks.enabled_index())
}

/// Re-apply `index` with Strategy A, falling back to B. Never swaps
/// sources and never micro-seeks.
pub fn correct_audio(player: &dyn MediaPlayer, index: usize) -> Result<NegotiationMethod, NegotiationError> {
    match apply_native(player, index) {
        Ok(()) => return Ok(NegotiationMethod::NativeEngineApi),
        Err(e) => trace!("native correction unavailable: {}", e),
    }

    let tracks = player.audio_tracks().ok_or(NegotiationError::StrategyUnavailable(
        NegotiationMethod::GenericTrackApi,
    ))?;
    let count = tracks.len();
    if index >= count {
        return Err(NegotiationError::IndexOutOfRange {
            kind: TrackKind::Audio,
            index,
            available: count,
        });
    }
    for i in 0..count {
        tracks.set_enabled(i, i == index);
    }
    tracks.notify_change();
    Ok(NegotiationMethod::GenericTrackApi)
}
