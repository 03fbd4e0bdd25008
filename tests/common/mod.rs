//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across the integration tests
#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use std::sync::{Arc, Once};
use tokio::sync::mpsc;
use tracing::Level;

use tneu_music::commands::music::utils::music_manager::MusicResult;
use tneu_music::commands::music::utils::playback::{
    EnqueueOutcome, GuildPlayer, PlayerReceiver, PlayerSender, PlayerSettings,
};
use tneu_music::commands::music::utils::queue_manager::TrackToken;

use mocks::{FakeGateway, RecordingAnnouncer};

static INIT: Once = Once::new();

/// Initialize tracing once for the whole test binary
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A player wired to fakes, driven directly without a task.
pub struct Harness {
    pub player: GuildPlayer,
    pub gateway: FakeGateway,
    pub announcer: RecordingAnnouncer,
    pub inbox: PlayerReceiver,
    sender: PlayerSender,
}

impl Harness {
    pub fn new(settings: PlayerSettings) -> Self {
        Self::with_gateway(FakeGateway::new(), settings)
    }

    pub fn with_gateway(gateway: FakeGateway, settings: PlayerSettings) -> Self {
        init();
        let (sender, inbox) = mpsc::unbounded_channel();
        let announcer = RecordingAnnouncer::default();
        let player = GuildPlayer::new(
            fixtures::guild(),
            Box::new(gateway.clone()),
            Arc::new(announcer.clone()),
            &settings,
            &sender,
        );
        Self {
            player,
            gateway,
            announcer,
            inbox,
            sender,
        }
    }

    /// Request `title` from the usual voice and text channels.
    pub async fn play(&mut self, title: &str) -> MusicResult<EnqueueOutcome> {
        self.player
            .enqueue(
                fixtures::track(title),
                Some(fixtures::voice_channel()),
                fixtures::text_channel(),
            )
            .await
    }

    /// Let the current stream end the way songbird reports it.
    pub async fn finish_current(&mut self) {
        let token = self.current_token().expect("a track should be playing");
        self.player.on_track_end(token).await;
    }

    pub fn current_token(&self) -> Option<TrackToken> {
        self.player.queue().current().map(|now| now.token)
    }

    pub fn current_title(&self) -> Option<String> {
        self.player
            .queue()
            .current()
            .map(|now| now.track.title.clone())
    }

    pub fn upcoming_titles(&self) -> Vec<String> {
        self.player
            .queue()
            .peek_all()
            .into_iter()
            .map(|track| track.title)
            .collect()
    }
}
