//! Player session
//!
//! One `Session` per attached player. It owns the catalog, the negotiator,
//! and the drift enforcers of that player; nothing is shared between
//! sessions. Disposing (or dropping) the session stops its enforcers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::catalog::{TrackCatalog, TrackKind};
use crate::config::NegotiatorConfig;
use crate::error::NegotiationError;
use crate::negotiate::{
    DriftEnforcer, NegotiationOutcome, SourceSwitchCoordinator, SubtitleTarget, TrackNegotiator,
};
use crate::player::{HttpProbe, LocatorProbe, MediaPlayer};
use crate::playlist::PlaylistSynthesizer;

pub use crate::negotiate::SessionEvent;

const EVENT_CAPACITY: usize = 64;

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub id: Uuid,
    pub audio: Option<NegotiationOutcome>,
    pub subtitle: Option<NegotiationOutcome>,
    pub audio_enforcer_running: bool,
    pub subtitle_enforcer_running: bool,
    pub disposed: bool,
}

pub struct Session<P: LocatorProbe = HttpProbe> {
    id: Uuid,
    span: tracing::Span,
    player: Arc<dyn MediaPlayer>,
    catalog: Arc<TrackCatalog>,
    synthesizer: PlaylistSynthesizer,
    base_locator: String,
    config: NegotiatorConfig,
    coordinator: Arc<SourceSwitchCoordinator<P>>,
    negotiator: TrackNegotiator<P>,
    audio_enforcer: DriftEnforcer,
    subtitle_enforcer: DriftEnforcer,
    events: broadcast::Sender<SessionEvent>,
    disposed: AtomicBool,
}

impl<P: LocatorProbe> Session<P> {
    /// Attach to `player`.
    ///
    /// `base_locator` is the locator synthesized manifests are resolved
    /// against; `synthesizer` carries the session's video variant ladder.
    pub fn attach(
        player: Arc<dyn MediaPlayer>,
        catalog: TrackCatalog,
        synthesizer: PlaylistSynthesizer,
        base_locator: impl Into<String>,
        config: NegotiatorConfig,
        probe: P,
    ) -> Self {
        let id = Uuid::new_v4();
        let span = tracing::info_span!("session", %id);
        let catalog = Arc::new(catalog);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let coordinator = Arc::new(SourceSwitchCoordinator::new(
            player.clone(),
            Arc::new(probe),
            config.readiness_timeout(),
        ));
        let negotiator = TrackNegotiator::new(
            player.clone(),
            catalog.clone(),
            coordinator.clone(),
            config.clone(),
            events.clone(),
        );
        let audio_enforcer = DriftEnforcer::new(
            TrackKind::Audio,
            player.clone(),
            config.poll_interval(),
            events.clone(),
        )
        .with_slot(negotiator.slot(TrackKind::Audio));
        let subtitle_enforcer = DriftEnforcer::new(
            TrackKind::Subtitle,
            player.clone(),
            config.poll_interval(),
            events.clone(),
        )
        .with_slot(negotiator.slot(TrackKind::Subtitle));

        span.in_scope(|| {
            info!(
                audio = catalog.audio().len(),
                subtitles = catalog.subtitles().len(),
                source = %player.source(),
                "session attached"
            )
        });

        Self {
            id,
            span,
            player,
            catalog,
            synthesizer,
            base_locator: base_locator.into(),
            config,
            coordinator,
            negotiator,
            audio_enforcer,
            subtitle_enforcer,
            events,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    pub fn player(&self) -> &Arc<dyn MediaPlayer> {
        &self.player
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Events of this session: negotiation outcomes and drift corrections
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            id: self.id,
            audio: self.negotiator.last_outcome(TrackKind::Audio),
            subtitle: self.negotiator.last_outcome(TrackKind::Subtitle),
            audio_enforcer_running: self.audio_enforcer.is_running(),
            subtitle_enforcer_running: self.subtitle_enforcer.is_running(),
            disposed: self.is_disposed(),
        }
    }

    /// Select audio track `index`; the audio enforcer follows the commit.
    ///
    /// `None` when superseded by a newer audio request or the session is
    /// disposed.
    pub async fn select_audio(&self, index: usize) -> Option<NegotiationOutcome> {
        if self.is_disposed() {
            warn!(session = %self.id, "select on disposed session");
            return None;
        }

        let outcome = self
            .negotiator
            .select(TrackKind::Audio, index)
            .instrument(self.span.clone())
            .await?;

        if let (true, Some(committed)) = (outcome.succeeded, outcome.committed_index) {
            if !self.is_disposed() {
                self.audio_enforcer.start(committed);
            }
        }
        Some(outcome)
    }

    /// Select a subtitle track or turn subtitles off
    pub async fn select_subtitle(&self, target: SubtitleTarget) -> Option<NegotiationOutcome> {
        if self.is_disposed() {
            warn!(session = %self.id, "select on disposed session");
            return None;
        }

        let outcome = self
            .negotiator
            .select_subtitle(target)
            .instrument(self.span.clone())
            .await?;

        if outcome.succeeded {
            match outcome.committed_index {
                Some(committed) if self.config.enforce_subtitles && !self.is_disposed() => {
                    self.subtitle_enforcer.start(committed)
                }
                Some(_) => {}
                None => self.subtitle_enforcer.stop(),
            }
        }
        Some(outcome)
    }

    /// Automatic selection once the stream's tracks are known.
    ///
    /// Waits for the engine to enumerate audio tracks, then selects the
    /// preferred language when the catalog has it, else track 0.
    pub async fn initial_selection(&self) -> Option<NegotiationOutcome> {
        if self.catalog.audio().is_empty() {
            return self.select_audio(0).await;
        }

        let discovered = self
            .negotiator
            .await_native_tracks()
            .instrument(self.span.clone())
            .await;

        let index = self
            .config
            .preferred_audio_language
            .as_deref()
            .and_then(|lang| self.catalog.find_by_language(TrackKind::Audio, lang))
            .map(|track| track.index)
            .unwrap_or(0);

        self.span.in_scope(|| info!(discovered, index, "initial audio selection"));
        self.select_audio(index).await
    }

    /// Move the player from a single-variant media playlist to its master
    /// playlist. `Ok(true)` when a swap happened.
    pub async fn ensure_master_source(&self) -> Result<bool, NegotiationError> {
        self.coordinator
            .ensure_master_source(&self.catalog)
            .instrument(self.span.clone())
            .await
    }

    /// Master playlist advertising all tracks of the session. Without an
    /// explicit default, the committed audio track is the default.
    pub fn synthesize_manifest(&self, default_audio: Option<usize>) -> String {
        let default_audio = default_audio.or_else(|| self.negotiator.committed(TrackKind::Audio));
        self.synthesizer
            .synthesize(&self.catalog, &self.base_locator, default_audio)
    }

    /// Stop the enforcers and refuse further selections. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.audio_enforcer.stop();
        self.subtitle_enforcer.stop();
        self.span.in_scope(|| info!("session disposed"));
    }
}

impl<P: LocatorProbe> Drop for Session<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
