//! Fakes for the voice gateway and the announcer
//! They record every call so tests can assert on side effects

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tneu_music::commands::music::audio_sources::track_metadata::TrackDescriptor;
use tneu_music::commands::music::utils::music_manager::{PlaybackError, VoiceError};
use tneu_music::commands::music::utils::playback::{
    Announcer, Notice, PlayerSender, VoiceGateway,
};
use tneu_music::commands::music::utils::queue_manager::TrackToken;
use tneu_music::commands::music::utils::registry::GatewayFactory;

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Join(ChannelId),
    Leave,
    Play { title: String, token: TrackToken },
    Stop,
    Pause,
    Resume,
    SetVolume(f32),
}

#[derive(Default)]
struct GatewayState {
    connected: Option<ChannelId>,
    calls: Vec<GatewayCall>,
    failing_titles: HashSet<String>,
    join_error: Option<VoiceError>,
}

/// In-memory `VoiceGateway`. Clones share state.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that is already sitting in `channel`
    pub fn connected_to(channel: ChannelId) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().connected = Some(channel);
        gateway
    }

    /// Make every `play` of `title` fail as unavailable
    pub fn fail_track(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_titles
            .insert(title.to_string());
    }

    pub fn fail_joins(&self, error: VoiceError) {
        self.state.lock().unwrap().join_error = Some(error);
    }

    /// Simulate being kicked from voice
    pub fn drop_connection(&self) {
        self.state.lock().unwrap().connected = None;
    }

    pub fn connected(&self) -> Option<ChannelId> {
        self.state.lock().unwrap().connected
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Play { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn last_token(&self) -> Option<TrackToken> {
        self.calls().into_iter().rev().find_map(|call| match call {
            GatewayCall::Play { token, .. } => Some(token),
            _ => None,
        })
    }

    fn record(&self, call: GatewayCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn connected_channel(&self) -> Option<ChannelId> {
        self.connected()
    }

    async fn join(&self, channel: ChannelId) -> Result<(), VoiceError> {
        self.record(GatewayCall::Join(channel));
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.join_error.clone() {
            return Err(error);
        }
        state.connected = Some(channel);
        Ok(())
    }

    async fn leave(&self) -> Result<(), VoiceError> {
        self.record(GatewayCall::Leave);
        let mut state = self.state.lock().unwrap();
        match state.connected.take() {
            Some(_) => Ok(()),
            None => Err(VoiceError::NotConnected),
        }
    }

    async fn play(
        &self,
        track: &TrackDescriptor,
        token: TrackToken,
        _volume: f32,
    ) -> Result<(), PlaybackError> {
        if self
            .state
            .lock()
            .unwrap()
            .failing_titles
            .contains(&track.title)
        {
            return Err(PlaybackError::StreamUnavailable(format!(
                "{} is region locked",
                track.title
            )));
        }
        self.record(GatewayCall::Play {
            title: track.title.clone(),
            token,
        });
        Ok(())
    }

    async fn stop(&self) {
        self.record(GatewayCall::Stop);
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.record(GatewayCall::Pause);
        Ok(())
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        self.record(GatewayCall::Resume);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        self.record(GatewayCall::SetVolume(volume));
        Ok(())
    }
}

/// Collects every notice instead of posting it to Discord.
#[derive(Clone, Default)]
pub struct RecordingAnnouncer {
    notices: Arc<Mutex<Vec<(ChannelId, Notice)>>>,
}

impl RecordingAnnouncer {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, notice)| notice.clone())
            .collect()
    }

    pub fn channels(&self) -> Vec<ChannelId> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|(channel, _)| *channel)
            .collect()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, channel: ChannelId, notice: Notice) {
        self.notices.lock().unwrap().push((channel, notice));
    }
}

/// Hands out one `FakeGateway` per guild and keeps a copy for assertions.
#[derive(Default)]
pub struct FakeGatewayFactory {
    gateways: Mutex<HashMap<GuildId, FakeGateway>>,
}

impl FakeGatewayFactory {
    pub fn gateway(&self, guild_id: GuildId) -> Option<FakeGateway> {
        self.gateways.lock().unwrap().get(&guild_id).cloned()
    }
}

impl GatewayFactory for FakeGatewayFactory {
    fn build(&self, guild_id: GuildId, _events: PlayerSender) -> Box<dyn VoiceGateway> {
        let gateway = FakeGateway::new();
        self.gateways
            .lock()
            .unwrap()
            .insert(guild_id, gateway.clone());
        Box::new(gateway)
    }
}
