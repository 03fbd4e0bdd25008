//! Now Playing buttons and playlist batches against a running player.

mod common;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use tneu_music::commands::music::utils::button_controls::ControlAction;
use tneu_music::commands::music::utils::component_handlers::{
    ControlOutcome, QueuedBatch, apply_control, enqueue_all,
};
use tneu_music::commands::music::utils::music_manager::{MusicError, VoiceError};
use tneu_music::commands::music::utils::playback::GuildPlayerHandle;
use tneu_music::commands::music::utils::queue_manager::PlaybackStatus;
use tneu_music::commands::music::utils::registry::GuildRegistry;

use common::fixtures::{self, track};
use common::mocks::{FakeGatewayFactory, RecordingAnnouncer};

fn registry() -> (GuildRegistry, Arc<FakeGatewayFactory>) {
    common::init();
    let factory = Arc::new(FakeGatewayFactory::default());
    let registry = GuildRegistry::new(
        factory.clone(),
        Arc::new(RecordingAnnouncer::default()),
        fixtures::no_idle_timeout(),
    );
    (registry, factory)
}

async fn playing(registry: &GuildRegistry, titles: &[&str]) -> GuildPlayerHandle {
    let player = registry.player(fixtures::guild());
    for title in titles {
        player
            .enqueue(track(title), Some(fixtures::voice_channel()), fixtures::text_channel())
            .await
            .unwrap();
    }
    player
}

#[tokio::test]
async fn test_pause_button_toggles() {
    let (registry, _) = registry();
    let player = playing(&registry, &["A"]).await;

    let first = apply_control(&player, ControlAction::TogglePause).await;
    let second = apply_control(&player, ControlAction::TogglePause).await;

    assert_eq!(first, Ok(ControlOutcome::Paused(track("A"))));
    assert_eq!(second, Ok(ControlOutcome::Resumed(track("A"))));
    assert_eq!(
        player.snapshot().await.unwrap().status,
        PlaybackStatus::Playing
    );
}

#[tokio::test]
async fn test_refresh_reports_paused_state() {
    let (registry, _) = registry();
    let player = playing(&registry, &["A"]).await;
    player.pause().await.unwrap();

    let outcome = apply_control(&player, ControlAction::Refresh).await;

    assert_eq!(
        outcome,
        Ok(ControlOutcome::Refreshed {
            track: track("A"),
            paused: true
        })
    );
}

#[tokio::test]
async fn test_skip_and_stop_buttons() {
    let (registry, factory) = registry();
    let player = playing(&registry, &["A", "B", "C"]).await;

    let skipped = apply_control(&player, ControlAction::Skip).await.unwrap();
    let stopped = apply_control(&player, ControlAction::Stop).await.unwrap();

    assert_matches!(skipped, ControlOutcome::Skipped(outcome) if outcome.next == Some(track("B")));
    assert_matches!(stopped, ControlOutcome::Stopped(outcome) if outcome.cleared == 1);
    let gateway = factory.gateway(fixtures::guild()).unwrap();
    assert_eq!(gateway.connected(), None);
}

#[tokio::test]
async fn test_controls_on_idle_player() {
    let (registry, _) = registry();
    let player = registry.player(fixtures::guild());

    for action in [
        ControlAction::TogglePause,
        ControlAction::Skip,
        ControlAction::Refresh,
    ] {
        assert_eq!(
            apply_control(&player, action).await,
            Err(MusicError::NothingPlaying),
            "{:?}",
            action
        );
    }
}

/// Entries that cannot stream are skipped, the rest keep their order.
#[tokio::test]
async fn test_enqueue_all_skips_failing_entries() {
    let (registry, factory) = registry();
    let player = registry.player(fixtures::guild());
    factory.gateway(fixtures::guild()).unwrap().fail_track("A");

    let batch = enqueue_all(
        &player,
        vec![track("A"), track("B"), track("C")],
        fixtures::voice_channel(),
        fixtures::text_channel(),
    )
    .await;

    assert_eq!(
        batch,
        Ok(QueuedBatch {
            queued: 2,
            started: Some(track("B")),
        })
    );
    let snapshot = player.snapshot().await.unwrap();
    assert_eq!(snapshot.current, Some(track("B")));
    assert_eq!(snapshot.upcoming, vec![track("C")]);
}

#[tokio::test]
async fn test_enqueue_all_reports_join_failure() {
    let (registry, factory) = registry();
    let player = registry.player(fixtures::guild());
    factory
        .gateway(fixtures::guild())
        .unwrap()
        .fail_joins(VoiceError::JoinFailed("missing permissions".to_string()));

    let batch = enqueue_all(
        &player,
        vec![track("A"), track("B")],
        fixtures::voice_channel(),
        fixtures::text_channel(),
    )
    .await;

    assert_matches!(batch, Err(MusicError::Voice(VoiceError::JoinFailed(_))));
}
