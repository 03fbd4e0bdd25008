//! TNEU Music: a Discord voice-channel music bot.
//!
//! Slash commands resolve songs through yt-dlp and the Spotify Web API, and a
//! per-guild player streams them one after another through songbird.

use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod events;

use commands::music::audio_sources::TrackResolver;
use commands::music::utils::registry::GuildRegistry;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    /// Playback state for every guild the bot has been used in.
    pub registry: Arc<GuildRegistry>,
    /// Turns user queries into playable tracks.
    pub resolver: Arc<TrackResolver>,
}
