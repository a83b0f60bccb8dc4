//! End-to-end negotiation scenarios

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{TrackCatalog, TrackInput, TrackInputs, TrackKind};
use crate::config::{ManifestConfig, NegotiatorConfig};
use crate::error::NegotiationError;
use crate::integration::fixtures::{two_audio_catalog, FakePlayer, FakeProbe};
use crate::negotiate::{NegotiationMethod, NegotiationOutcome, SessionEvent, SubtitleTarget};
use crate::player::{MediaPlayer, PlayerEvent, TextTrackKind};
use crate::playlist::{parse_master_playlist, PlaylistSynthesizer, VariantLadder};
use crate::session::Session;

const MASTER: &str = "http://cdn/hls/abc/master.m3u8";

fn attach(player: &Arc<FakePlayer>, catalog: TrackCatalog, config: NegotiatorConfig) -> Session<FakeProbe> {
    Session::attach(
        player.clone(),
        catalog,
        PlaylistSynthesizer::new(VariantLadder::two_rung(), ManifestConfig::default()),
        MASTER,
        config,
        FakeProbe::reachable(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_native_round_trip_disables_other_tracks() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.expose_engine(3);
    let catalog = TrackCatalog::from_manual(&TrackInputs {
        audio: vec![
            TrackInput::new("a0.m3u8", "en", "English"),
            TrackInput::new("a1.m3u8", "es", "Spanish"),
            TrackInput::new("a2.m3u8", "fr", "French"),
        ],
        subtitles: vec![],
    });
    let session = attach(&player, catalog, NegotiatorConfig::default());

    let outcome = session.select_audio(2).await.unwrap();

    assert_eq!(outcome.committed_index, Some(2));
    assert_eq!(outcome.method_used, Some(NegotiationMethod::NativeEngineApi));
    let engine = player.engine().unwrap();
    assert!(!engine.is_audio_track_enabled(0));
    assert!(!engine.is_audio_track_enabled(1));
    assert!(engine.is_audio_track_enabled(2));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_select_does_not_swap_again() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.expose_generic(2);
    player.auto_ready(true);
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    let first = session.select_audio(1).await.unwrap();
    let second = session.select_audio(1).await.unwrap();

    assert_eq!(first.committed_index, Some(1));
    assert_eq!(second.committed_index, first.committed_index);
    assert_eq!(second.method_used, Some(NegotiationMethod::GenericTrackApi));
    assert_eq!(player.source_changes(), 0);
    assert_eq!(player.source(), MASTER);
}

#[tokio::test(start_paused = true)]
async fn test_enforcer_restores_track_without_substitution() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.expose_engine(2);
    player.auto_ready(true);
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());
    let mut events = session.subscribe();

    session.select_audio(1).await.unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Negotiated { kind: TrackKind::Audio, .. }
    ));

    // quality switch inside the engine falls back to the default track
    player.engine_reset_silently(0);
    tokio::time::sleep(Duration::from_millis(2000) + Duration::from_millis(50)).await;

    assert_eq!(player.engine().unwrap().enabled_audio_track(), Some(1));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Corrected {
            kind: TrackKind::Audio,
            index: 1
        }
    );
    assert_eq!(player.source_changes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fullscreen_change_triggers_correction() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.expose_engine(2);
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    session.select_audio(1).await.unwrap();
    tokio::task::yield_now().await;

    player.engine_reset_silently(0);
    player.emit(PlayerEvent::FullscreenChange);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(player.engine().unwrap().enabled_audio_track(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_swap_timeout_reverts_to_previous_source() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.set_position(61.0);
    player.play();
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    let started = tokio::time::Instant::now();
    let outcome = session.select_audio(1).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(!outcome.succeeded);
    assert_eq!(player.source(), MASTER);
    assert!((player.position() - 61.0).abs() < 0.5);
    assert!(player.is_playing());
    assert!(!session.state().audio_enforcer_running);
}

#[tokio::test(start_paused = true)]
async fn test_generic_track_api_scenario() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.expose_generic(2);
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    let outcome = session.select_audio(1).await.unwrap();

    assert_eq!(
        outcome,
        NegotiationOutcome {
            succeeded: true,
            method_used: Some(NegotiationMethod::GenericTrackApi),
            committed_index: Some(1),
            failure: None,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_subtitle_catalog_scenario() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.set_text_tracks(&[TextTrackKind::Subtitles]);
    let catalog = TrackCatalog::from_manual(&TrackInputs {
        audio: vec![TrackInput::new("a0.m3u8", "en", "English")],
        subtitles: vec![],
    });
    let session = attach(&player, catalog, NegotiatorConfig::default());

    let outcome = session.select_subtitle(SubtitleTarget::Track(0)).await.unwrap();

    assert!(!outcome.succeeded);
    assert_eq!(outcome.method_used, None);
    assert_eq!(outcome.committed_index, None);
    assert_eq!(
        outcome.failure,
        Some(NegotiationError::CatalogEmpty(TrackKind::Subtitle))
    );
    assert_eq!(player.text_tracks().showing_index(), None);
    assert_eq!(player.source_changes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subtitle_off_always_succeeds() {
    let player = Arc::new(FakePlayer::new(MASTER));
    let session = attach(&player, TrackCatalog::default(), NegotiatorConfig::default());

    let outcome = session.select_subtitle(SubtitleTarget::Off).await.unwrap();
    assert!(outcome.succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_media_playlist_upgraded_before_initial_selection() {
    let player = Arc::new(FakePlayer::new("http://cdn/hls/abc/media-1/stream.m3u8"));
    player.auto_ready(true);
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    assert!(session.ensure_master_source().await.unwrap());
    assert_eq!(player.source(), MASTER);

    player.expose_engine(2);
    let outcome = session.initial_selection().await.unwrap();
    assert_eq!(outcome.committed_index, Some(0));
    assert_eq!(outcome.method_used, Some(NegotiationMethod::NativeEngineApi));
    assert_eq!(player.source_changes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_synthesized_manifest_parses_back_into_catalog() {
    let player = Arc::new(FakePlayer::new(MASTER));
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    let manifest = session.synthesize_manifest(Some(1));
    let parsed = parse_master_playlist(&manifest).unwrap();
    let inputs = crate::playlist::parse::adaptive_inputs(&parsed.renditions);
    let reloaded = TrackCatalog::load(&TrackInputs::default(), &inputs);

    assert_eq!(reloaded.audio().len(), 2);
    assert_eq!(reloaded.subtitles().len(), 1);
    assert_eq!(
        reloaded.get(TrackKind::Audio, 1).unwrap().source_locator,
        "http://cdn/hls/abc/audio_1.m3u8"
    );
    assert_eq!(parsed.ladder.variants, VariantLadder::two_rung().variants);
    assert!(parsed.renditions.iter().filter(|r| r.default).count() == 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_stops_enforcement() {
    let player = Arc::new(FakePlayer::new(MASTER));
    player.expose_engine(2);
    let session = attach(&player, two_audio_catalog(), NegotiatorConfig::default());

    session.select_audio(1).await.unwrap();
    drop(session);

    player.engine_reset_silently(0);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(player.engine().unwrap().enabled_audio_track(), Some(0));
}
