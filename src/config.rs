//! Runtime configuration read from the environment (and `.env` via `dotenv`).

use poise::serenity_prelude::UserId;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::commands::music::audio_sources::spotify::SpotifyCredentials;
use crate::commands::music::audio_sources::youtube::DEFAULT_YTDLP;
use crate::commands::music::utils::playback::PlayerSettings;

pub const DEFAULT_IDLE_DISCONNECT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    /// `None` disables Spotify links.
    pub spotify: Option<SpotifyCredentials>,
    /// Spotify account whose public playlists `/tneu` lists.
    pub spotify_user_id: Option<String>,
    pub owner_id: Option<UserId>,
    /// `None` keeps an idle bot connected.
    pub idle_disconnect_after: Option<Duration>,
    pub ytdlp_path: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("spotify", &self.spotify)
            .field("spotify_user_id", &self.spotify_user_id)
            .field("owner_id", &self.owner_id)
            .field("idle_disconnect_after", &self.idle_disconnect_after)
            .field("ytdlp_path", &self.ytdlp_path)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let discord_token = var("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let spotify = match (var("SPOTIFY_CLIENT_ID"), var("SPOTIFY_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            _ => {
                warn!(
                    "Only one of SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET is set, Spotify links are disabled"
                );
                None
            }
        };

        let owner_id = var("OWNER_ID")
            .map(|raw| {
                raw.parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .map(UserId::new)
                    .ok_or_else(|| ConfigError::Invalid {
                        key: "OWNER_ID",
                        reason: format!("`{}` is not a Discord user id", raw),
                    })
            })
            .transpose()?;

        let idle_disconnect_after = match var("IDLE_DISCONNECT_AFTER") {
            None => Some(DEFAULT_IDLE_DISCONNECT),
            Some(raw) if raw.eq_ignore_ascii_case("off") => None,
            Some(raw) => Some(humantime::parse_duration(&raw).map_err(|e| {
                ConfigError::Invalid {
                    key: "IDLE_DISCONNECT_AFTER",
                    reason: e.to_string(),
                }
            })?),
        };

        Ok(Self {
            discord_token,
            spotify,
            spotify_user_id: var("SPOTIFY_USER_ID"),
            owner_id,
            idle_disconnect_after,
            ytdlp_path: var("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP.to_string()),
        })
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            idle_timeout: self.idle_disconnect_after,
            default_volume: DEFAULT_VOLUME,
        }
    }
}
