use poise::serenity_prelude as serenity;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use songbird::{Event, EventContext};
use tracing::{debug, warn};

use super::playback::{PlayerMessage, PlayerSender};
use super::queue_manager::TrackToken;

/// Event handler for when a song ends
pub struct TrackEndNotifier {
    pub events: PlayerSender,
    pub token: TrackToken,
}

#[async_trait]
impl songbird::EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(_) = ctx {
            debug!("Track {:?} ended", self.token);
            let _ = self.events.send(PlayerMessage::TrackEnded(self.token));
        }
        None
    }
}

/// Event handler for a stream that failed while playing
pub struct TrackErrorNotifier {
    pub events: PlayerSender,
    pub token: TrackToken,
}

#[async_trait]
impl songbird::EventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            let reason = tracks
                .first()
                .map(|(state, _)| match &state.playing {
                    PlayMode::Errored(e) => format!("{:?}", e),
                    other => format!("{:?}", other),
                })
                .unwrap_or_else(|| "unknown error".to_string());
            let _ = self.events.send(PlayerMessage::TrackErrored {
                token: self.token,
                reason,
            });
        }
        None
    }
}

/// Reports a voice driver that lost its connection. Disconnects we asked for
/// carry no reason and are not reported.
pub struct DriverDisconnectNotifier {
    pub guild_id: serenity::GuildId,
    pub events: PlayerSender,
}

#[async_trait]
impl songbird::EventHandler for DriverDisconnectNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::DriverDisconnect(data) = ctx {
            if let Some(reason) = &data.reason {
                warn!(
                    "Voice driver disconnected in guild {}: {:?}",
                    self.guild_id, reason
                );
                let _ = self.events.send(PlayerMessage::ConnectionDropped);
            }
        }
        None
    }
}
