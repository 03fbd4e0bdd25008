use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::client::Context;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::YoutubeDl;
use songbird::tracks::{Track, TrackHandle};
use songbird::{CoreEvent, Event, Songbird, TrackEvent};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::AudioSource;
use crate::commands::music::audio_sources::track_metadata::TrackDescriptor;

use super::embedded_messages;
use super::event_handlers::{DriverDisconnectNotifier, TrackEndNotifier, TrackErrorNotifier};
use super::playback::{Announcer, Notice, PlayerSender, VoiceGateway};
use super::queue_manager::TrackToken;
use super::registry::GatewayFactory;

/// External service a resolution depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Youtube,
    Spotify,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Youtube => write!(f, "YouTube"),
            Provider::Spotify => write!(f, "Spotify"),
        }
    }
}

/// Errors turning a user query into a track
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No results found for `{query}`")]
    NotFound { query: String },

    #[error("{provider} is unavailable right now: {reason}")]
    ProviderUnavailable { provider: Provider, reason: String },
}

impl ResolutionError {
    pub fn not_found(query: &str) -> Self {
        Self::NotFound {
            query: query.to_string(),
        }
    }

    pub fn unavailable(provider: Provider, reason: impl fmt::Display) -> Self {
        Self::ProviderUnavailable {
            provider,
            reason: reason.to_string(),
        }
    }
}

/// Errors talking to the voice gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("You need to be in a voice channel to play music!")]
    NoChannel,

    #[error("I'm already playing music in <#{0}>")]
    AlreadyConnectedElsewhere(ChannelId),

    #[error("The voice connection was lost")]
    ConnectionDropped,

    #[error("Failed to join voice channel: {0}")]
    JoinFailed(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("You need to be in the same voice channel as the bot!")]
    NotListening,

    #[error("Failed to get voice manager")]
    NoVoiceManager,
}

/// Errors starting or controlling a stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),
}

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Nothing is playing right now")]
    NothingPlaying,

    #[error("The current song is not paused")]
    NotPaused,

    #[error("The current song is already paused")]
    AlreadyPaused,

    #[error("Volume must be between 0 and 100, got {0}")]
    InvalidVolume(u8),

    #[error("Invalid page number! Please use 1-{total_pages}")]
    InvalidPage { page: usize, total_pages: usize },

    #[error("Please provide a valid YouTube URL")]
    InvalidYoutubeUrl,

    #[error("The music player for this server is shutting down")]
    PlayerUnavailable,

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Lookups against the serenity context shared by the music commands
pub struct MusicManager;

impl MusicManager {
    /// Get the Songbird voice client from the context
    pub async fn get_songbird(ctx: &Context) -> Result<Arc<Songbird>, VoiceError> {
        songbird::get(ctx).await.ok_or(VoiceError::NoVoiceManager)
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: serenity::UserId,
    ) -> Option<ChannelId> {
        let guild = ctx.cache.guild(guild_id)?;
        guild.voice_states.get(&user_id)?.channel_id
    }
}

/// `VoiceGateway` backed by a songbird call.
pub struct SongbirdGateway {
    songbird: Arc<Songbird>,
    guild_id: GuildId,
    http_client: reqwest::Client,
    events: PlayerSender,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdGateway {
    pub fn new(
        songbird: Arc<Songbird>,
        guild_id: GuildId,
        http_client: reqwest::Client,
        events: PlayerSender,
    ) -> Self {
        Self {
            songbird,
            guild_id,
            http_client,
            events,
            current: Mutex::new(None),
        }
    }

    async fn current_handle(&self) -> Result<TrackHandle, PlaybackError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| PlaybackError::StreamUnavailable("nothing is streaming".to_string()))
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn connected_channel(&self) -> Option<ChannelId> {
        let call = self.songbird.get(self.guild_id)?;
        let channel = call.lock().await.current_channel()?;
        Some(ChannelId::new(channel.0.get()))
    }

    async fn join(&self, channel: ChannelId) -> Result<(), VoiceError> {
        let fresh_call = self.songbird.get(self.guild_id).is_none();

        let call = self
            .songbird
            .join(self.guild_id, channel)
            .await
            .map_err(|e| VoiceError::JoinFailed(e.to_string()))?;

        let mut handler = call.lock().await;
        if fresh_call {
            handler.add_global_event(
                Event::Core(CoreEvent::DriverDisconnect),
                DriverDisconnectNotifier {
                    guild_id: self.guild_id,
                    events: self.events.clone(),
                },
            );
        }
        if let Err(e) = handler.deafen(true).await {
            warn!("Failed to self-deafen in guild {}: {}", self.guild_id, e);
        }

        info!("Joined voice channel {} in guild {}", channel, self.guild_id);
        Ok(())
    }

    async fn leave(&self) -> Result<(), VoiceError> {
        self.current.lock().await.take();

        // Check if we're in a voice channel
        if self.songbird.get(self.guild_id).is_none() {
            return Err(VoiceError::NotConnected);
        }

        self.songbird
            .remove(self.guild_id)
            .await
            .map_err(|e| VoiceError::JoinFailed(e.to_string()))?;

        info!("Left voice channel in guild {}", self.guild_id);
        Ok(())
    }

    async fn play(
        &self,
        track: &TrackDescriptor,
        token: TrackToken,
        volume: f32,
    ) -> Result<(), PlaybackError> {
        let call = self
            .songbird
            .get(self.guild_id)
            .ok_or_else(|| PlaybackError::StreamUnavailable(VoiceError::NotConnected.to_string()))?;

        let input = YoutubeDl::new(self.http_client.clone(), stream_url(track)?.to_string());
        let handle = call
            .lock()
            .await
            .play_only(Track::from(input).volume(volume));

        let end = TrackEndNotifier {
            events: self.events.clone(),
            token,
        };
        let error = TrackErrorNotifier {
            events: self.events.clone(),
            token,
        };
        handle
            .add_event(Event::Track(TrackEvent::End), end)
            .and_then(|_| handle.add_event(Event::Track(TrackEvent::Error), error))
            .map_err(|e| PlaybackError::StreamUnavailable(e.to_string()))?;

        debug!(
            "Streaming {} in guild {} as {:?}",
            track.stream_reference, self.guild_id, token
        );
        *self.current.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        if let Some(handle) = self.current.lock().await.take() {
            if let Err(e) = handle.stop() {
                debug!("Track in guild {} was already gone: {}", self.guild_id, e);
            }
        }
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.current_handle()
            .await?
            .pause()
            .map_err(|e| PlaybackError::StreamUnavailable(e.to_string()))
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        self.current_handle()
            .await?
            .play()
            .map_err(|e| PlaybackError::StreamUnavailable(e.to_string()))
    }

    async fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        self.current_handle()
            .await?
            .set_volume(volume)
            .map_err(|e| PlaybackError::StreamUnavailable(e.to_string()))
    }
}

/// Builds one `SongbirdGateway` per guild from the shared songbird manager.
pub struct SongbirdGatewayFactory {
    songbird: Arc<Songbird>,
    http_client: reqwest::Client,
}

impl SongbirdGatewayFactory {
    pub fn new(songbird: Arc<Songbird>, http_client: reqwest::Client) -> Self {
        Self {
            songbird,
            http_client,
        }
    }
}

impl GatewayFactory for SongbirdGatewayFactory {
    fn build(&self, guild_id: GuildId, events: PlayerSender) -> Box<dyn VoiceGateway> {
        Box::new(SongbirdGateway::new(
            self.songbird.clone(),
            guild_id,
            self.http_client.clone(),
            events,
        ))
    }
}

/// Posts player notices as embeds in the guild's last used text channel.
pub struct ChannelAnnouncer {
    http: Arc<serenity::Http>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, channel: ChannelId, notice: Notice) {
        let message = embedded_messages::notice_message(&notice);
        if let Err(e) = channel.send_message(&self.http, message).await {
            warn!("Failed to announce in channel {}: {}", channel, e);
        }
    }
}

/// The link handed to yt-dlp. Only http(s) URLs reach the subprocess.
fn stream_url(track: &TrackDescriptor) -> Result<&str, PlaybackError> {
    let reference = track.stream_reference.trim();
    if AudioSource::is_url(reference) {
        Ok(reference)
    } else {
        Err(PlaybackError::StreamUnavailable(format!(
            "not a web link: {}",
            reference
        )))
    }
}
