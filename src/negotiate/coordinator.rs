//! Source switch coordinator
//!
//! Points the player at a new source without losing the viewer's place:
//! snapshot, probe, swap, wait for readiness under a deadline, restore. A
//! swap that times out or errors is reverted before it is reported.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::catalog::TrackCatalog;
use crate::error::NegotiationError;
use crate::player::{LocatorProbe, MediaPlayer, PlaybackSnapshot, PlayerEvent};
use crate::playlist::master_locator_for;

pub struct SourceSwitchCoordinator<P> {
    player: Arc<dyn MediaPlayer>,
    probe: Arc<P>,
    readiness_timeout: Duration,
}

impl<P: LocatorProbe> SourceSwitchCoordinator<P> {
    pub fn new(player: Arc<dyn MediaPlayer>, probe: Arc<P>, readiness_timeout: Duration) -> Self {
        Self {
            player,
            probe,
            readiness_timeout,
        }
    }

    /// Swap the player to `new_locator`.
    ///
    /// An unreachable locator leaves the player untouched. On timeout or a
    /// player error the previous source and playback state are put back.
    pub async fn swap(&self, new_locator: &str) -> Result<(), NegotiationError> {
        let player = self.player.as_ref();
        let snapshot = PlaybackSnapshot::capture(player);
        let previous = player.source();

        self.probe.probe(new_locator).await?;

        // subscribe before issuing the source so the signal cannot be missed
        let mut events = player.events();
        player.set_source(new_locator);
        info!(from = %previous, to = %new_locator, "source swap issued");

        match tokio::time::timeout(self.readiness_timeout, wait_ready(&mut events)).await {
            Ok(Ok(())) => {
                snapshot.restore(player);
                info!(locator = %new_locator, "source swap complete");
                Ok(())
            }
            Ok(Err(message)) => {
                warn!(locator = %new_locator, "player error during swap: {}", message);
                self.revert(&previous, snapshot);
                Err(NegotiationError::PlayerError(message))
            }
            Err(_) => {
                warn!(
                    locator = %new_locator,
                    timeout_ms = self.readiness_timeout.as_millis() as u64,
                    "no readiness signal, reverting"
                );
                self.revert(&previous, snapshot);
                Err(NegotiationError::ReadinessTimeout {
                    locator: new_locator.to_string(),
                    timeout_ms: self.readiness_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Move a player attached to a single-variant media playlist to the
    /// sibling master playlist.
    ///
    /// Returns `Ok(true)` when a swap happened. Players already on a master
    /// playlist, on a non-HLS source, or sessions without audio tracks are
    /// left alone.
    pub async fn ensure_master_source(&self, catalog: &TrackCatalog) -> Result<bool, NegotiationError> {
        if catalog.audio().is_empty() {
            return Ok(false);
        }

        let current = self.player.source();
        let Some(master) = master_locator_for(&current) else {
            return Ok(false);
        };

        info!(from = %current, to = %master, "switching to master playlist");
        self.swap(&master).await.map(|_| true)
    }

    fn revert(&self, previous: &str, snapshot: PlaybackSnapshot) {
        let player = self.player.as_ref();
        player.set_source(previous);
        snapshot.restore(player);
    }
}

/// Wait for `MetadataReady`; a player error ends the wait early
async fn wait_ready(events: &mut broadcast::Receiver<PlayerEvent>) -> Result<(), String> {
    loop {
        match events.recv().await {
            Ok(PlayerEvent::MetadataReady) => return Ok(()),
            Ok(PlayerEvent::Error(message)) => return Err(message),
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Err("player event channel closed".to_string()),
        }
    }
}
