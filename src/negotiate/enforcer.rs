//! Drift enforcer
//!
//! Adaptive engines reset their track state on manifest reloads, quality
//! switches and fullscreen transitions. The enforcer polls the live track
//! list and re-applies the committed track when it drifted. It only uses
//! the in-place strategies; it never swaps sources and never micro-seeks.
//!
//! When attached to a negotiator's [`TrackSlot`] it stays off the player
//! while a negotiation of its kind is in flight, and corrects towards the
//! slot's committed index rather than its own target.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::catalog::TrackKind;
use crate::player::{MediaPlayer, PlayerEvent};

use super::negotiator::TrackSlot;
use super::strategy;
use super::{SessionEvent, SubtitleTarget};

struct Running {
    cancel: CancellationToken,
    target: watch::Sender<usize>,
    task: JoinHandle<()>,
}

/// Keeps one track kind on its committed index
pub struct DriftEnforcer {
    kind: TrackKind,
    player: Arc<dyn MediaPlayer>,
    poll_interval: Duration,
    events: broadcast::Sender<SessionEvent>,
    slot: Option<Arc<TrackSlot>>,
    running: Mutex<Option<Running>>,
}

impl DriftEnforcer {
    pub fn new(
        kind: TrackKind,
        player: Arc<dyn MediaPlayer>,
        poll_interval: Duration,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            kind,
            player,
            poll_interval,
            events,
            slot: None,
            running: Mutex::new(None),
        }
    }

    /// Share the negotiation slot of this kind
    pub fn with_slot(mut self, slot: Arc<TrackSlot>) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Start enforcing `committed_index`. Starting a running enforcer only
    /// changes its target.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, committed_index: usize) {
        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            current.target.send_replace(committed_index);
            return;
        }

        let cancel = CancellationToken::new();
        let (target, target_rx) = watch::channel(committed_index);
        let task = tokio::spawn(run(
            self.kind,
            self.player.clone(),
            self.poll_interval,
            target_rx,
            self.slot.clone(),
            self.events.clone(),
            cancel.clone(),
        ));

        debug!(kind = %self.kind, index = committed_index, "drift enforcer started");
        *running = Some(Running {
            cancel,
            target,
            task,
        });
    }

    /// Point a running enforcer at a new index. No-op when stopped.
    pub fn retarget(&self, committed_index: usize) {
        if let Some(running) = self.running.lock().as_ref() {
            running.target.send_replace(committed_index);
        }
    }

    /// Stop the enforcer. Calling it again does nothing.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.cancel.cancel();
            running.task.abort();
            debug!(kind = %self.kind, "drift enforcer stopped");
        }
    }
}

impl Drop for DriftEnforcer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    kind: TrackKind,
    player: Arc<dyn MediaPlayer>,
    poll_interval: Duration,
    mut target: watch::Receiver<usize>,
    slot: Option<Arc<TrackSlot>>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut player_events = Some(player.events());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            changed = target.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            event = recv_event(&mut player_events) => match event {
                Some(PlayerEvent::TrackListChange) | Some(PlayerEvent::FullscreenChange) => {
                    trace!(%kind, "player event, checking drift");
                }
                _ => continue,
            },
        }

        let requested = *target.borrow_and_update();
        let corrected = match slot.as_deref() {
            None => enforce(kind, player.as_ref(), requested),
            Some(slot) => slot
                .try_with_lock(|committed| {
                    committed.and_then(|index| enforce(kind, player.as_ref(), index))
                })
                .unwrap_or_else(|| {
                    trace!(%kind, "negotiation in flight, drift check skipped");
                    None
                }),
        };
        if let Some(corrected) = corrected {
            let _ = events.send(SessionEvent::Corrected {
                kind,
                index: corrected,
            });
        }
    }
}

/// Next relevant player event. Pends forever once the channel closed so
/// the enforcer keeps polling.
async fn recv_event(events: &mut Option<broadcast::Receiver<PlayerEvent>>) -> Option<PlayerEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };

    match rx.recv().await {
        Ok(event) => Some(event),
        Err(RecvError::Lagged(skipped)) => {
            trace!(skipped, "player events lagged");
            Some(PlayerEvent::TrackListChange)
        }
        Err(RecvError::Closed) => {
            *events = None;
            None
        }
    }
}

/// Re-apply `index` when the live state drifted. Returns the index when a
/// correction was made.
fn enforce(kind: TrackKind, player: &dyn MediaPlayer, index: usize) -> Option<usize> {
    match kind {
        TrackKind::Audio => {
            if strategy::active_audio(player) == Some(index) {
                return None;
            }
            match strategy::correct_audio(player, index) {
                Ok(method) => {
                    debug!(index, %method, "audio drift corrected");
                    Some(index)
                }
                Err(e) => {
                    trace!(index, "audio correction not possible: {}", e);
                    None
                }
            }
        }
        TrackKind::Subtitle => {
            if player.text_tracks().showing_subtitle() == Some(index) {
                return None;
            }
            match strategy::apply_text_track(player, SubtitleTarget::Track(index)) {
                Ok(()) => {
                    debug!(index, "subtitle drift corrected");
                    Some(index)
                }
                Err(e) => {
                    trace!(index, "subtitle correction not possible: {}", e);
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::fixtures::FakePlayer;
    use crate::player::TextTrackKind;

    fn enforcer(player: &Arc<FakePlayer>, kind: TrackKind) -> (DriftEnforcer, broadcast::Receiver<SessionEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (
            DriftEnforcer::new(kind, player.clone(), Duration::from_secs(2), tx),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_restores_native_track_within_one_interval() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.expose_engine(2);
        strategy::apply_native(player.as_ref(), 1).unwrap();

        let (enforcer, mut rx) = enforcer(&player, TrackKind::Audio);
        enforcer.start(1);
        tokio::task::yield_now().await;

        // engine-internal reset, without a track list event
        player.engine_reset_silently(0);
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(strategy::active_audio(player.as_ref()), Some(1));
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Corrected {
                kind: TrackKind::Audio,
                index: 1
            }
        );
        assert_eq!(player.source_changes(), 0);
        assert!(player.seeks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reacts_to_track_list_change() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.expose_generic(2);

        let (enforcer, _rx) = enforcer(&player, TrackKind::Audio);
        enforcer.start(1);
        tokio::task::yield_now().await;

        // reset with a change event, well before the first tick
        player.audio_tracks().unwrap().set_enabled(1, false);
        player.audio_tracks().unwrap().set_enabled(0, true);
        player.emit(PlayerEvent::TrackListChange);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(strategy::active_audio(player.as_ref()), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_off_player_while_slot_is_held() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.expose_engine(2);
        strategy::apply_native(player.as_ref(), 1).unwrap();

        let slot = Arc::new(TrackSlot::default());
        slot.set_committed(Some(1));
        let (enforcer, mut rx) = enforcer(&player, TrackKind::Audio);
        let enforcer = enforcer.with_slot(slot.clone());
        enforcer.start(1);
        tokio::task::yield_now().await;

        // a negotiation owns the player and moves it to track 0
        let guard = slot.hold().await;
        assert!(slot.is_busy());
        player.engine_reset_silently(0);
        player.emit(PlayerEvent::TrackListChange);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(strategy::active_audio(player.as_ref()), Some(0));

        // it commits 0; the enforcer follows the slot, not its stale target
        slot.set_committed(Some(0));
        drop(guard);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(strategy::active_audio(player.as_ref()), Some(0));
        assert!(rx.try_recv().is_err());

        player.engine_reset_silently(1);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(strategy::active_audio(player.as_ref()), Some(0));
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Corrected {
                kind: TrackKind::Audio,
                index: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_committed_means_nothing_enforced() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.set_text_tracks(&[TextTrackKind::Subtitles, TextTrackKind::Subtitles]);

        let (enforcer, _rx) = enforcer(&player, TrackKind::Subtitle);
        let enforcer = enforcer.with_slot(Arc::new(TrackSlot::default()));
        enforcer.start(1);
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(player.text_tracks().showing_subtitle(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retarget() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.expose_engine(3);

        let (enforcer, _rx) = enforcer(&player, TrackKind::Audio);
        enforcer.start(0);
        enforcer.retarget(2);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(strategy::active_audio(player.as_ref()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subtitle_drift() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.set_text_tracks(&[TextTrackKind::Subtitles, TextTrackKind::Subtitles]);

        let (enforcer, _rx) = enforcer(&player, TrackKind::Subtitle);
        enforcer.start(1);
        tokio::time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(player.text_tracks().showing_subtitle(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.expose_engine(2);

        let (enforcer, _rx) = enforcer(&player, TrackKind::Audio);
        enforcer.start(1);
        assert!(enforcer.is_running());

        enforcer.stop();
        enforcer.stop();
        assert!(!enforcer.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(strategy::active_audio(player.as_ref()), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/master.m3u8"));
        player.expose_engine(2);

        let (enforcer, _rx) = enforcer(&player, TrackKind::Audio);
        enforcer.start(1);
        drop(enforcer);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(strategy::active_audio(player.as_ref()), Some(0));
    }
}
