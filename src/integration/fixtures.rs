//! Test fixtures for integration tests
//!
//! Provides a scripted player and probe for testing negotiation without a
//! real playback engine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::catalog::{TrackCatalog, TrackInput, TrackInputs};
use crate::error::NegotiationError;
use crate::player::{
    EngineTrackControl, LocatorProbe, MediaPlayer, PlayerEvent, TextTrackKind, TextTrackList,
    TextTrackMode, TrackList,
};

/// Catalog with English and Spanish audio and one English subtitle
pub fn two_audio_catalog() -> TrackCatalog {
    TrackCatalog::from_manual(&TrackInputs {
        audio: vec![
            TrackInput::new("http://cdn/hls/abc/audio_0.m3u8", "en", "English"),
            TrackInput::new("http://cdn/hls/abc/audio_1.m3u8", "es", "Spanish"),
        ],
        subtitles: vec![TrackInput::new(
            "http://cdn/hls/abc/subtitle_0.vtt",
            "en",
            "English",
        )],
    })
}

#[derive(Debug, Default)]
struct PlayerInner {
    source: String,
    position: f64,
    playing: bool,
    auto_ready: bool,
    fail_next: Option<String>,
    source_changes: usize,
    seeks: Vec<f64>,
}

/// Engine-side audio track control
#[derive(Debug, Default)]
pub struct FakeEngine {
    enabled: Mutex<Vec<bool>>,
    switched: Mutex<Vec<usize>>,
    restarts: AtomicUsize,
}

impl EngineTrackControl for FakeEngine {
    fn audio_track_count(&self) -> usize {
        self.enabled.lock().len()
    }

    fn is_audio_track_enabled(&self, index: usize) -> bool {
        self.enabled.lock().get(index).copied().unwrap_or(false)
    }

    fn set_audio_track_enabled(&self, index: usize, enabled: bool) {
        if let Some(slot) = self.enabled.lock().get_mut(index) {
            *slot = enabled;
        }
    }

    fn notify_track_switched(&self, index: usize) {
        self.switched.lock().push(index);
    }

    fn restart_loading(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Generic audio track list
#[derive(Debug, Default)]
pub struct FakeTrackList {
    enabled: Mutex<Vec<bool>>,
    changes: AtomicUsize,
}

impl TrackList for FakeTrackList {
    fn len(&self) -> usize {
        self.enabled.lock().len()
    }

    fn is_enabled(&self, index: usize) -> bool {
        self.enabled.lock().get(index).copied().unwrap_or(false)
    }

    fn set_enabled(&self, index: usize, enabled: bool) {
        if let Some(slot) = self.enabled.lock().get_mut(index) {
            *slot = enabled;
        }
    }

    fn notify_change(&self) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct FakeTextTracks {
    tracks: Mutex<Vec<(TextTrackKind, TextTrackMode)>>,
}

impl TextTrackList for FakeTextTracks {
    fn len(&self) -> usize {
        self.tracks.lock().len()
    }

    fn kind(&self, index: usize) -> TextTrackKind {
        self.tracks
            .lock()
            .get(index)
            .map(|(kind, _)| *kind)
            .unwrap_or(TextTrackKind::Metadata)
    }

    fn mode(&self, index: usize) -> TextTrackMode {
        self.tracks
            .lock()
            .get(index)
            .map(|(_, mode)| *mode)
            .unwrap_or(TextTrackMode::Disabled)
    }

    fn set_mode(&self, index: usize, mode: TextTrackMode) {
        if let Some(track) = self.tracks.lock().get_mut(index) {
            track.1 = mode;
        }
    }
}

/// Scripted player.
///
/// Sources never become ready unless `auto_ready` is on. The engine and
/// generic track surfaces are hidden until exposed.
pub struct FakePlayer {
    inner: Mutex<PlayerInner>,
    events: broadcast::Sender<PlayerEvent>,
    engine: FakeEngine,
    engine_exposed: AtomicBool,
    generic: FakeTrackList,
    generic_exposed: AtomicBool,
    text: FakeTextTracks,
}

impl FakePlayer {
    pub fn new(source: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(PlayerInner {
                source: source.to_string(),
                ..Default::default()
            }),
            events,
            engine: FakeEngine::default(),
            engine_exposed: AtomicBool::new(false),
            generic: FakeTrackList::default(),
            generic_exposed: AtomicBool::new(false),
            text: FakeTextTracks::default(),
        }
    }

    /// Signal `MetadataReady` after every `set_source`
    pub fn auto_ready(&self, on: bool) {
        self.inner.lock().auto_ready = on;
    }

    /// Signal an error instead of readiness for the next `set_source`
    pub fn fail_next_load(&self, message: &str) {
        self.inner.lock().fail_next = Some(message.to_string());
    }

    pub fn set_position(&self, position: f64) {
        self.inner.lock().position = position;
    }

    /// Expose the engine with `count` audio tracks, track 0 enabled
    pub fn expose_engine(&self, count: usize) {
        *self.engine.enabled.lock() = (0..count).map(|i| i == 0).collect();
        self.engine_exposed.store(true, Ordering::SeqCst);
    }

    /// Expose the generic list with `count` audio tracks, track 0 enabled
    pub fn expose_generic(&self, count: usize) {
        *self.generic.enabled.lock() = (0..count).map(|i| i == 0).collect();
        self.generic_exposed.store(true, Ordering::SeqCst);
    }

    /// Replace the text tracks; all start disabled
    pub fn set_text_tracks(&self, kinds: &[TextTrackKind]) {
        *self.text.tracks.lock() = kinds
            .iter()
            .map(|kind| (*kind, TextTrackMode::Disabled))
            .collect();
    }

    /// Engine-internal reset to `index`, without any event
    pub fn engine_reset_silently(&self, index: usize) {
        let mut enabled = self.engine.enabled.lock();
        for (i, slot) in enabled.iter_mut().enumerate() {
            *slot = i == index;
        }
    }

    pub fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    pub fn source_changes(&self) -> usize {
        self.inner.lock().source_changes
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.inner.lock().seeks.clone()
    }

    pub fn engine_switch_notifications(&self) -> Vec<usize> {
        self.engine.switched.lock().clone()
    }

    pub fn engine_load_restarts(&self) -> usize {
        self.engine.restarts.load(Ordering::SeqCst)
    }

    pub fn generic_change_notifications(&self) -> usize {
        self.generic.changes.load(Ordering::SeqCst)
    }
}

impl MediaPlayer for FakePlayer {
    fn source(&self) -> String {
        self.inner.lock().source.clone()
    }

    fn set_source(&self, locator: &str) {
        let event = {
            let mut inner = self.inner.lock();
            inner.source = locator.to_string();
            inner.source_changes += 1;
            inner.playing = false;
            match inner.fail_next.take() {
                Some(message) => Some(PlayerEvent::Error(message)),
                None if inner.auto_ready => Some(PlayerEvent::MetadataReady),
                None => None,
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn position(&self) -> f64 {
        self.inner.lock().position
    }

    fn seek(&self, position_secs: f64) {
        let mut inner = self.inner.lock();
        inner.position = position_secs;
        inner.seeks.push(position_secs);
    }

    fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    fn play(&self) {
        self.inner.lock().playing = true;
    }

    fn pause(&self) {
        self.inner.lock().playing = false;
    }

    fn events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    fn engine(&self) -> Option<&dyn EngineTrackControl> {
        if self.engine_exposed.load(Ordering::SeqCst) {
            Some(&self.engine)
        } else {
            None
        }
    }

    fn audio_tracks(&self) -> Option<&dyn TrackList> {
        if self.generic_exposed.load(Ordering::SeqCst) {
            Some(&self.generic)
        } else {
            None
        }
    }

    fn text_tracks(&self) -> &dyn TextTrackList {
        &self.text
    }
}

/// Probe with a fixed answer
#[derive(Debug, Default)]
pub struct FakeProbe {
    reachable: bool,
}

impl FakeProbe {
    pub fn reachable() -> Self {
        Self { reachable: true }
    }

    pub fn unreachable() -> Self {
        Self { reachable: false }
    }
}

impl LocatorProbe for FakeProbe {
    async fn probe(&self, locator: &str) -> Result<(), NegotiationError> {
        if self.reachable {
            Ok(())
        } else {
            Err(NegotiationError::UnreachableLocator(locator.to_string()))
        }
    }
}
