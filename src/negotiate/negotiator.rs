//! Track negotiator
//!
//! Runs selection requests through the strategy chain. Requests are tagged
//! with a per-kind generation; a request that was overtaken by a newer one
//! of the same kind is dropped without recording anything. Player mutation
//! is serialized per kind, so audio and subtitle requests do not wait on
//! each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::catalog::{TrackCatalog, TrackDescriptor, TrackKind};
use crate::config::NegotiatorConfig;
use crate::error::NegotiationError;
use crate::player::{LocatorProbe, MediaPlayer};

use super::coordinator::SourceSwitchCoordinator;
use super::strategy::{self, MicroSeek};
use super::{NegotiationMethod, NegotiationOutcome, SessionEvent, SubtitleTarget};

#[derive(Debug, Clone, Copy)]
enum Request {
    Audio(usize),
    Subtitle(SubtitleTarget),
}

impl Request {
    fn kind(self) -> TrackKind {
        match self {
            Request::Audio(_) => TrackKind::Audio,
            Request::Subtitle(_) => TrackKind::Subtitle,
        }
    }
}

/// Per-kind negotiation state.
///
/// `lock` is held for the whole of a negotiation. The drift enforcer of the
/// same kind shares the slot: it only corrects when it can take the lock,
/// and it corrects towards `committed`.
#[derive(Debug, Default)]
pub struct TrackSlot {
    generation: AtomicU64,
    lock: Mutex<()>,
    last_outcome: RwLock<Option<NegotiationOutcome>>,
    committed: RwLock<Option<usize>>,
}

impl TrackSlot {
    /// Index committed by the last successful request
    pub fn committed(&self) -> Option<usize> {
        *self.committed.read()
    }

    /// Whether a negotiation currently owns the player for this kind
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Run `f` with the player mutation lock, unless a negotiation holds it
    pub fn try_with_lock<T>(&self, f: impl FnOnce(Option<usize>) -> T) -> Option<T> {
        let _guard = self.lock.try_lock().ok()?;
        Some(f(self.committed()))
    }

    #[cfg(test)]
    pub(crate) async fn hold(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    #[cfg(test)]
    pub(crate) fn set_committed(&self, index: Option<usize>) {
        *self.committed.write() = index;
    }
}

pub struct TrackNegotiator<P> {
    player: Arc<dyn MediaPlayer>,
    catalog: Arc<TrackCatalog>,
    coordinator: Arc<SourceSwitchCoordinator<P>>,
    config: NegotiatorConfig,
    events: broadcast::Sender<SessionEvent>,
    audio: Arc<TrackSlot>,
    subtitle: Arc<TrackSlot>,
}

impl<P: LocatorProbe> TrackNegotiator<P> {
    pub fn new(
        player: Arc<dyn MediaPlayer>,
        catalog: Arc<TrackCatalog>,
        coordinator: Arc<SourceSwitchCoordinator<P>>,
        config: NegotiatorConfig,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            player,
            catalog,
            coordinator,
            config,
            events,
            audio: Arc::default(),
            subtitle: Arc::default(),
        }
    }

    fn state(&self, kind: TrackKind) -> &TrackSlot {
        match kind {
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Subtitle => self.subtitle.as_ref(),
        }
    }

    /// Shared slot of `kind`, for the drift enforcer
    pub fn slot(&self, kind: TrackKind) -> Arc<TrackSlot> {
        match kind {
            TrackKind::Audio => self.audio.clone(),
            TrackKind::Subtitle => self.subtitle.clone(),
        }
    }

    /// Outcome of the last request of `kind` that was not superseded
    pub fn last_outcome(&self, kind: TrackKind) -> Option<NegotiationOutcome> {
        self.state(kind).last_outcome.read().clone()
    }

    /// Index committed by the last successful request of `kind`
    pub fn committed(&self, kind: TrackKind) -> Option<usize> {
        self.state(kind).committed()
    }

    /// Select track `index` of `kind`.
    ///
    /// Returns `None` when a newer request of the same kind was issued
    /// before this one finished.
    pub async fn select(&self, kind: TrackKind, index: usize) -> Option<NegotiationOutcome> {
        match kind {
            TrackKind::Audio => self.run(Request::Audio(index)).await,
            TrackKind::Subtitle => self.run(Request::Subtitle(SubtitleTarget::Track(index))).await,
        }
    }

    /// Select a subtitle track or turn subtitles off
    pub async fn select_subtitle(&self, target: SubtitleTarget) -> Option<NegotiationOutcome> {
        self.run(Request::Subtitle(target)).await
    }

    async fn run(&self, request: Request) -> Option<NegotiationOutcome> {
        let kind = request.kind();
        let state = self.state(kind);
        let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let _guard = state.lock.lock().await;
        if self.is_stale(kind, generation) {
            debug!(%kind, generation, "request superseded before it started");
            return None;
        }

        let outcome = match request {
            Request::Audio(index) => self.negotiate_audio(index).await,
            Request::Subtitle(target) => self.negotiate_subtitle(target),
        };

        if self.is_stale(kind, generation) {
            debug!(%kind, generation, "request superseded, outcome dropped");
            return None;
        }

        self.commit(kind, &outcome);
        Some(outcome)
    }

    fn is_stale(&self, kind: TrackKind, generation: u64) -> bool {
        self.state(kind).generation.load(Ordering::SeqCst) != generation
    }

    fn commit(&self, kind: TrackKind, outcome: &NegotiationOutcome) {
        let state = self.state(kind);
        if outcome.succeeded {
            *state.committed.write() = outcome.committed_index;
            info!(
                %kind,
                index = ?outcome.committed_index,
                method = ?outcome.method_used,
                "track committed"
            );
        } else if let Some(failure) = &outcome.failure {
            info!(%kind, "negotiation failed: {}", failure);
        }
        *state.last_outcome.write() = Some(outcome.clone());

        // no subscribers is fine
        let _ = self.events.send(SessionEvent::Negotiated {
            kind,
            outcome: outcome.clone(),
        });
    }

    fn target_track(&self, kind: TrackKind, index: usize) -> Result<&TrackDescriptor, NegotiationError> {
        let available = self.catalog.len(kind);
        if available == 0 {
            return Err(NegotiationError::CatalogEmpty(kind));
        }
        self.catalog
            .get(kind, index)
            .ok_or(NegotiationError::IndexOutOfRange {
                kind,
                index,
                available,
            })
    }

    async fn negotiate_audio(&self, index: usize) -> NegotiationOutcome {
        let track = match self.target_track(TrackKind::Audio, index) {
            Ok(track) => track,
            Err(e) => return NegotiationOutcome::failure(e),
        };
        let player = self.player.as_ref();

        for method in NegotiationMethod::CHAIN {
            if !method.is_applicable(player, track, &self.config) {
                debug!(index, "{} not applicable", method);
                continue;
            }

            let result = match method {
                NegotiationMethod::NativeEngineApi => strategy::apply_native(player, index),
                NegotiationMethod::GenericTrackApi => {
                    strategy::apply_generic(player, index, Some(self.micro_seek())).await
                }
                NegotiationMethod::SourceSubstitution => self.substitute(track).await,
            };

            match result {
                Ok(()) => return NegotiationOutcome::success(method, Some(index)),
                Err(e) => debug!(index, "{} failed: {}", method, e),
            }
        }

        NegotiationOutcome::failure(NegotiationError::StrategyExhausted {
            kind: TrackKind::Audio,
            index,
        })
    }

    fn negotiate_subtitle(&self, target: SubtitleTarget) -> NegotiationOutcome {
        if let SubtitleTarget::Track(index) = target {
            if let Err(e) = self.target_track(TrackKind::Subtitle, index) {
                return NegotiationOutcome::failure(e);
            }
        }

        match strategy::apply_text_track(self.player.as_ref(), target) {
            Ok(()) => {
                let committed = match target {
                    SubtitleTarget::Track(index) => Some(index),
                    SubtitleTarget::Off => None,
                };
                NegotiationOutcome::success(NegotiationMethod::GenericTrackApi, committed)
            }
            Err(e) => NegotiationOutcome::failure(e),
        }
    }

    /// Strategy C
    async fn substitute(&self, track: &TrackDescriptor) -> Result<(), NegotiationError> {
        let locator = self
            .config
            .manifest_locator(track.index)
            .unwrap_or_else(|| track.source_locator.clone());

        if self.player.source() == locator {
            debug!(%locator, "already on substitution source");
            return Ok(());
        }
        self.coordinator.swap(&locator).await
    }

    fn micro_seek(&self) -> MicroSeek {
        MicroSeek {
            epsilon_secs: self.config.micro_seek_epsilon_secs,
            settle: self.config.micro_seek_settle(),
        }
    }

    /// Wait until the engine (or the generic list) enumerates audio tracks.
    ///
    /// Checks `discovery_attempts` times, `discovery_interval` apart.
    /// Returns the number of tracks found, 0 when none showed up.
    pub async fn await_native_tracks(&self) -> usize {
        let attempts = self.config.discovery_attempts.max(1);

        for attempt in 0..attempts {
            let count = self.enumerated_audio_tracks();
            if count > 0 {
                debug!(count, attempt, "audio tracks discovered");
                return count;
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(self.config.discovery_interval()).await;
            }
        }

        debug!(attempts, "no audio tracks discovered");
        0
    }

    fn enumerated_audio_tracks(&self) -> usize {
        let player = self.player.as_ref();
        let native = player.engine().map(|e| e.audio_track_count()).unwrap_or(0);
        if native > 0 {
            return native;
        }
        player.audio_tracks().map(|t| t.len()).unwrap_or(0)
    }
}
