//! Per-guild playback controller.
//!
//! Every guild gets one [`GuildPlayer`] owned by a spawned task. Commands,
//! songbird track events and idle timers all reach it as [`PlayerMessage`]s on
//! a single channel, so each transition (finish, pop, start) completes before
//! the next message is looked at.

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::track_metadata::TrackDescriptor;

use super::music_manager::{MusicError, MusicResult, PlaybackError, VoiceError};
use super::queue_manager::{GuildQueue, PlaybackStatus, TrackToken};

pub type PlayerSender = mpsc::UnboundedSender<PlayerMessage>;
pub type PlayerReceiver = mpsc::UnboundedReceiver<PlayerMessage>;

/// One guild's voice connection and its current stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Voice channel the bot is connected to in this guild, if any.
    async fn connected_channel(&self) -> Option<ChannelId>;
    async fn join(&self, channel: ChannelId) -> Result<(), VoiceError>;
    async fn leave(&self) -> Result<(), VoiceError>;
    /// Start streaming `track`, replacing whatever was playing. End and error
    /// events for this stream must be reported with `token`.
    async fn play(
        &self,
        track: &TrackDescriptor,
        token: TrackToken,
        volume: f32,
    ) -> Result<(), PlaybackError>;
    async fn stop(&self);
    async fn pause(&self) -> Result<(), PlaybackError>;
    async fn resume(&self) -> Result<(), PlaybackError>;
    async fn set_volume(&self, volume: f32) -> Result<(), PlaybackError>;
}

/// Sends player notices to a text channel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, channel: ChannelId, notice: Notice);
}

/// Things the player reports on its own, outside of a command reply
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NowPlaying(TrackDescriptor),
    TrackFailed {
        track: TrackDescriptor,
        error: PlaybackError,
    },
    QueueFinished,
    LeftIdle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// The guild was idle and the track started right away.
    NowPlaying(TrackDescriptor),
    /// The track was appended behind the current one.
    Queued {
        track: TrackDescriptor,
        position: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipOutcome {
    pub skipped: TrackDescriptor,
    /// The track that took over, or `None` when the queue ran dry.
    pub next: Option<TrackDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopOutcome {
    pub stopped: Option<TrackDescriptor>,
    pub cleared: usize,
    pub was_connected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<TrackDescriptor>,
    pub upcoming: Vec<TrackDescriptor>,
    pub status: PlaybackStatus,
    /// Volume in percent.
    pub volume: u8,
    /// Summed known durations of `upcoming`.
    pub upcoming_duration: Duration,
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.upcoming.is_empty()
    }
}

type Reply<T> = oneshot::Sender<MusicResult<T>>;

pub enum PlayerMessage {
    Enqueue {
        track: TrackDescriptor,
        voice_channel: Option<ChannelId>,
        text_channel: ChannelId,
        reply: Reply<EnqueueOutcome>,
    },
    Skip {
        reply: Reply<SkipOutcome>,
    },
    Stop {
        reply: Reply<StopOutcome>,
    },
    Pause {
        reply: Reply<TrackDescriptor>,
    },
    Resume {
        reply: Reply<TrackDescriptor>,
    },
    /// Pause a playing track or resume a paused one.
    TogglePause {
        reply: Reply<(TrackDescriptor, PlaybackStatus)>,
    },
    SetVolume {
        percent: u8,
        reply: Reply<u8>,
    },
    Snapshot {
        reply: Reply<QueueSnapshot>,
    },
    /// The stream started under this token finished or was stopped.
    TrackEnded(TrackToken),
    /// The stream started under this token failed mid-play.
    TrackErrored {
        token: TrackToken,
        reason: String,
    },
    /// The voice driver lost its connection.
    ConnectionDropped,
    /// The bot was removed from its voice channel by someone else.
    Disconnected,
    IdleTimeout(u64),
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

/// Tunables shared by every guild's player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSettings {
    /// How long an idle bot stays in voice. `None` keeps it connected.
    pub idle_timeout: Option<Duration>,
    /// Initial volume in percent.
    pub default_volume: u8,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(300)),
            default_volume: 50,
        }
    }
}

/// Playback state machine of one guild.
pub struct GuildPlayer {
    guild_id: GuildId,
    queue: GuildQueue,
    gateway: Box<dyn VoiceGateway>,
    announcer: Arc<dyn Announcer>,
    text_channel: Option<ChannelId>,
    volume: u8,
    last_token: u64,
    idle_generation: u64,
    idle_timeout: Option<Duration>,
    mailbox: mpsc::WeakUnboundedSender<PlayerMessage>,
}

impl GuildPlayer {
    /// `mailbox` is the sender side of the channel this player is fed from.
    /// Idle timers post back into it.
    pub fn new(
        guild_id: GuildId,
        gateway: Box<dyn VoiceGateway>,
        announcer: Arc<dyn Announcer>,
        settings: &PlayerSettings,
        mailbox: &PlayerSender,
    ) -> Self {
        Self {
            guild_id,
            queue: GuildQueue::new(),
            gateway,
            announcer,
            text_channel: None,
            volume: settings.default_volume.min(100),
            last_token: 0,
            idle_generation: 0,
            idle_timeout: settings.idle_timeout,
            mailbox: mailbox.downgrade(),
        }
    }

    pub fn queue(&self) -> &GuildQueue {
        &self.queue
    }

    pub fn status(&self) -> PlaybackStatus {
        self.queue.status()
    }

    /// Apply one message. Breaks once the player has shut down.
    pub async fn handle(&mut self, message: PlayerMessage) -> ControlFlow<()> {
        match message {
            PlayerMessage::Enqueue {
                track,
                voice_channel,
                text_channel,
                reply,
            } => {
                let _ = reply.send(self.enqueue(track, voice_channel, text_channel).await);
            }
            PlayerMessage::Skip { reply } => {
                let _ = reply.send(self.skip().await);
            }
            PlayerMessage::Stop { reply } => {
                let _ = reply.send(Ok(self.stop().await));
            }
            PlayerMessage::Pause { reply } => {
                let _ = reply.send(self.pause().await);
            }
            PlayerMessage::Resume { reply } => {
                let _ = reply.send(self.resume().await);
            }
            PlayerMessage::TogglePause { reply } => {
                let _ = reply.send(self.toggle_pause().await);
            }
            PlayerMessage::SetVolume { percent, reply } => {
                let _ = reply.send(self.set_volume(percent).await);
            }
            PlayerMessage::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            PlayerMessage::TrackEnded(token) => self.on_track_end(token).await,
            PlayerMessage::TrackErrored { token, reason } => {
                self.on_track_error(token, reason).await
            }
            PlayerMessage::ConnectionDropped => self.on_connection_dropped().await,
            PlayerMessage::Disconnected => self.on_disconnected().await,
            PlayerMessage::IdleTimeout(generation) => self.on_idle_timeout(generation).await,
            PlayerMessage::Shutdown { reply } => {
                self.stop().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    pub async fn enqueue(
        &mut self,
        track: TrackDescriptor,
        voice_channel: Option<ChannelId>,
        text_channel: ChannelId,
    ) -> MusicResult<EnqueueOutcome> {
        let requested = voice_channel.ok_or(VoiceError::NoChannel)?;
        let connected = self.gateway.connected_channel().await;

        if self.queue.status() != PlaybackStatus::Idle {
            if let Some(channel) = connected.filter(|channel| *channel != requested) {
                return Err(VoiceError::AlreadyConnectedElsewhere(channel).into());
            }
            self.text_channel = Some(text_channel);
            let position = self.queue.enqueue(track.clone());
            debug!(
                "Queued '{}' at position {} in guild {}",
                track.title, position, self.guild_id
            );
            return Ok(EnqueueOutcome::Queued { track, position });
        }

        self.text_channel = Some(text_channel);
        // Any pending idle disconnect is void from here on.
        self.idle_generation += 1;

        if connected != Some(requested) {
            self.queue.set_connecting();
            if let Err(e) = self.gateway.join(requested).await {
                warn!("Failed to join {} in guild {}: {}", requested, self.guild_id, e);
                self.queue.set_idle();
                if connected.is_some() {
                    self.arm_idle_timer();
                }
                return Err(e.into());
            }
        }

        // An idle guild has nothing queued, so the new track is the head.
        match self.start(track.clone()).await {
            Ok(()) => Ok(EnqueueOutcome::NowPlaying(track)),
            Err(e) => {
                warn!(
                    "Failed to start '{}' in guild {}: {}",
                    track.title, self.guild_id, e
                );
                self.go_idle();
                Err(e.into())
            }
        }
    }

    pub async fn skip(&mut self) -> MusicResult<SkipOutcome> {
        let skipped = self
            .queue
            .finish_current()
            .ok_or(MusicError::NothingPlaying)?;
        self.gateway.stop().await;
        info!("Skipped '{}' in guild {}", skipped.track.title, self.guild_id);

        let next = self.advance().await;
        Ok(SkipOutcome {
            skipped: skipped.track,
            next,
        })
    }

    /// Clear everything and disconnect. Leaves the player idle no matter what
    /// state it was in.
    pub async fn stop(&mut self) -> StopOutcome {
        let stopped = self.queue.current().map(|now| now.track.clone());
        let cleared = self.queue.clear();
        self.idle_generation += 1;
        self.gateway.stop().await;

        let was_connected = self.gateway.connected_channel().await.is_some();
        if was_connected {
            if let Err(e) = self.gateway.leave().await {
                warn!("Error leaving voice channel in guild {}: {}", self.guild_id, e);
            }
        }

        info!(
            "Stopped playback in guild {} ({} queued tracks cleared)",
            self.guild_id, cleared
        );
        StopOutcome {
            stopped,
            cleared,
            was_connected,
        }
    }

    pub async fn pause(&mut self) -> MusicResult<TrackDescriptor> {
        let track = self.current_track()?;
        if self.queue.status() == PlaybackStatus::Paused {
            return Err(MusicError::AlreadyPaused);
        }
        self.gateway.pause().await?;
        self.queue.set_paused(true);
        Ok(track)
    }

    pub async fn resume(&mut self) -> MusicResult<TrackDescriptor> {
        let track = self.current_track()?;
        if self.queue.status() != PlaybackStatus::Paused {
            return Err(MusicError::NotPaused);
        }
        self.gateway.resume().await?;
        self.queue.set_paused(false);
        Ok(track)
    }

    /// Returns the track and the status it was left in.
    pub async fn toggle_pause(&mut self) -> MusicResult<(TrackDescriptor, PlaybackStatus)> {
        if self.queue.status() == PlaybackStatus::Paused {
            let track = self.resume().await?;
            Ok((track, PlaybackStatus::Playing))
        } else {
            let track = self.pause().await?;
            Ok((track, PlaybackStatus::Paused))
        }
    }

    /// Set the volume in percent for the current and all later tracks
    pub async fn set_volume(&mut self, percent: u8) -> MusicResult<u8> {
        if percent > 100 {
            return Err(MusicError::InvalidVolume(percent));
        }
        if self.queue.current().is_some() {
            self.gateway.set_volume(volume_scale(percent)).await?;
        }
        self.volume = percent;
        Ok(percent)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.queue.current().map(|now| now.track.clone()),
            upcoming: self.queue.peek_all(),
            status: self.queue.status(),
            volume: self.volume,
            upcoming_duration: self.queue.total_duration(),
        }
    }

    pub async fn on_track_end(&mut self, token: TrackToken) {
        if !self.is_current(token) {
            debug!("Ignoring end of stale {:?} in guild {}", token, self.guild_id);
            return;
        }
        self.queue.finish_current();

        match self.advance().await {
            Some(track) => self.announce(Notice::NowPlaying(track)).await,
            None => self.announce(Notice::QueueFinished).await,
        }
    }

    pub async fn on_track_error(&mut self, token: TrackToken, reason: String) {
        let Some(now) = self.queue.current().filter(|now| now.token == token).cloned() else {
            debug!("Ignoring error of stale {:?} in guild {}", token, self.guild_id);
            return;
        };
        warn!(
            "Stream for '{}' failed in guild {}: {}",
            now.track.title, self.guild_id, reason
        );
        self.announce(Notice::TrackFailed {
            track: now.track,
            error: PlaybackError::StreamUnavailable(reason),
        })
        .await;
        self.on_track_end(token).await;
    }

    pub async fn on_connection_dropped(&mut self) {
        let Some(token) = self.queue.current().map(|now| now.token) else {
            return;
        };
        warn!(
            "Voice connection dropped in guild {}: {}",
            self.guild_id,
            VoiceError::ConnectionDropped
        );
        self.on_track_end(token).await;
    }

    pub async fn on_disconnected(&mut self) {
        if self.gateway.connected_channel().await.is_some() {
            // Late update for a channel we already left and rejoined.
            return;
        }
        let cleared = self.queue.clear();
        self.idle_generation += 1;
        self.gateway.stop().await;
        // Drops songbird's call so the next join starts fresh.
        if let Err(e) = self.gateway.leave().await {
            debug!("No call to release in guild {}: {}", self.guild_id, e);
        }
        info!(
            "Removed from voice in guild {}, dropped {} queued tracks",
            self.guild_id, cleared
        );
    }

    pub async fn on_idle_timeout(&mut self, generation: u64) {
        if generation != self.idle_generation || self.queue.status() != PlaybackStatus::Idle {
            return;
        }
        if self.gateway.connected_channel().await.is_none() {
            return;
        }
        match self.gateway.leave().await {
            Ok(()) => {
                info!("Left idle voice channel in guild {}", self.guild_id);
                self.announce(Notice::LeftIdle).await;
            }
            Err(e) => warn!("Failed to leave idle channel in guild {}: {}", self.guild_id, e),
        }
    }

    /// Start the next playable track. Tracks that fail to start are announced
    /// and dropped. Goes idle when the queue runs dry.
    async fn advance(&mut self) -> Option<TrackDescriptor> {
        while let Some(track) = self.queue.pop_next() {
            match self.start(track.clone()).await {
                Ok(()) => return Some(track),
                Err(error) => {
                    warn!(
                        "Skipping '{}' in guild {}: {}",
                        track.title, self.guild_id, error
                    );
                    self.announce(Notice::TrackFailed { track, error }).await;
                }
            }
        }
        self.go_idle();
        None
    }

    async fn start(&mut self, track: TrackDescriptor) -> Result<(), PlaybackError> {
        self.last_token += 1;
        let token = TrackToken(self.last_token);
        self.gateway
            .play(&track, token, volume_scale(self.volume))
            .await?;
        info!("Now playing '{}' in guild {}", track.title, self.guild_id);
        self.queue.start(track, token);
        Ok(())
    }

    fn go_idle(&mut self) {
        self.queue.set_idle();
        self.idle_generation += 1;
        self.arm_idle_timer();
    }

    fn arm_idle_timer(&self) {
        let Some(after) = self.idle_timeout else {
            return;
        };
        let mailbox = self.mailbox.clone();
        let generation = self.idle_generation;
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender.send(PlayerMessage::IdleTimeout(generation));
            }
        });
    }

    fn is_current(&self, token: TrackToken) -> bool {
        self.queue.current().is_some_and(|now| now.token == token)
    }

    fn current_track(&self) -> MusicResult<TrackDescriptor> {
        self.queue
            .current()
            .map(|now| now.track.clone())
            .ok_or(MusicError::NothingPlaying)
    }

    async fn announce(&self, notice: Notice) {
        match self.text_channel {
            Some(channel) => self.announcer.announce(channel, notice).await,
            None => debug!("No text channel for guild {}, dropped {:?}", self.guild_id, notice),
        }
    }
}

fn volume_scale(percent: u8) -> f32 {
    f32::from(percent) / 100.0
}

/// Drain `inbox` into `player` until it shuts down or every sender is gone.
pub async fn run(mut player: GuildPlayer, mut inbox: PlayerReceiver) {
    let guild_id = player.guild_id;
    while let Some(message) = inbox.recv().await {
        if player.handle(message).await.is_break() {
            break;
        }
    }
    debug!("Player task for guild {} finished", guild_id);
}

/// Cheap, cloneable front of a guild's player task.
#[derive(Clone)]
pub struct GuildPlayerHandle {
    guild_id: GuildId,
    sender: PlayerSender,
}

impl GuildPlayerHandle {
    pub fn new(guild_id: GuildId, sender: PlayerSender) -> Self {
        Self { guild_id, sender }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// True once the player task has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(&self, message: impl FnOnce(Reply<T>) -> PlayerMessage) -> MusicResult<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(message(reply))
            .map_err(|_| MusicError::PlayerUnavailable)?;
        response.await.map_err(|_| MusicError::PlayerUnavailable)?
    }

    pub async fn enqueue(
        &self,
        track: TrackDescriptor,
        voice_channel: Option<ChannelId>,
        text_channel: ChannelId,
    ) -> MusicResult<EnqueueOutcome> {
        self.request(|reply| PlayerMessage::Enqueue {
            track,
            voice_channel,
            text_channel,
            reply,
        })
        .await
    }

    pub async fn skip(&self) -> MusicResult<SkipOutcome> {
        self.request(|reply| PlayerMessage::Skip { reply }).await
    }

    pub async fn stop(&self) -> MusicResult<StopOutcome> {
        self.request(|reply| PlayerMessage::Stop { reply }).await
    }

    pub async fn pause(&self) -> MusicResult<TrackDescriptor> {
        self.request(|reply| PlayerMessage::Pause { reply }).await
    }

    pub async fn resume(&self) -> MusicResult<TrackDescriptor> {
        self.request(|reply| PlayerMessage::Resume { reply }).await
    }

    pub async fn toggle_pause(&self) -> MusicResult<(TrackDescriptor, PlaybackStatus)> {
        self.request(|reply| PlayerMessage::TogglePause { reply })
            .await
    }

    pub async fn set_volume(&self, percent: u8) -> MusicResult<u8> {
        self.request(|reply| PlayerMessage::SetVolume { percent, reply })
            .await
    }

    pub async fn snapshot(&self) -> MusicResult<QueueSnapshot> {
        self.request(|reply| PlayerMessage::Snapshot { reply }).await
    }

    /// Post an event without waiting for it to be handled.
    pub fn notify(&self, message: PlayerMessage) {
        if self.sender.send(message).is_err() {
            debug!("Player for guild {} is gone, event dropped", self.guild_id);
        }
    }

    /// Ask the player to stop and exit, and wait until it has.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self
            .sender
            .send(PlayerMessage::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = done.await;
        }
    }
}
