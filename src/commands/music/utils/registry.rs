//! Map from guild to its player task. Players are spawned on first use and
//! live until the guild goes away or the bot shuts down.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use super::playback::{
    self, Announcer, GuildPlayer, GuildPlayerHandle, PlayerSender, PlayerSettings, VoiceGateway,
};

/// Builds the voice gateway for a newly spawned player. `events` is the
/// player's own mailbox, for songbird callbacks to report into.
pub trait GatewayFactory: Send + Sync {
    fn build(&self, guild_id: GuildId, events: PlayerSender) -> Box<dyn VoiceGateway>;
}

pub struct GuildRegistry {
    players: DashMap<GuildId, GuildPlayerHandle>,
    factory: Arc<dyn GatewayFactory>,
    announcer: Arc<dyn Announcer>,
    settings: PlayerSettings,
}

impl GuildRegistry {
    pub fn new(
        factory: Arc<dyn GatewayFactory>,
        announcer: Arc<dyn Announcer>,
        settings: PlayerSettings,
    ) -> Self {
        Self {
            players: DashMap::new(),
            factory,
            announcer,
            settings,
        }
    }

    /// The guild's player, spawning it on first use.
    pub fn player(&self, guild_id: GuildId) -> GuildPlayerHandle {
        match self.players.entry(guild_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    entry.insert(self.spawn(guild_id));
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => entry.insert(self.spawn(guild_id)).clone(),
        }
    }

    /// The guild's player if one was ever spawned.
    pub fn existing(&self, guild_id: GuildId) -> Option<GuildPlayerHandle> {
        self.players
            .get(&guild_id)
            .map(|handle| handle.clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Forget a guild and tell its player to shut down. Returns false when
    /// the guild had no player.
    pub fn remove(&self, guild_id: GuildId) -> bool {
        let Some((_, handle)) = self.players.remove(&guild_id) else {
            return false;
        };
        info!("Dropping playback state for guild {}", guild_id);
        tokio::spawn(async move { handle.shutdown().await });
        true
    }

    /// Shut every player down and wait until all of them have left voice.
    pub async fn shutdown_all(&self) {
        let handles: Vec<GuildPlayerHandle> = self
            .players
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.players.clear();

        info!("Shutting down {} guild players", handles.len());
        join_all(handles.iter().map(|handle| handle.shutdown())).await;
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn spawn(&self, guild_id: GuildId) -> GuildPlayerHandle {
        let (sender, inbox) = mpsc::unbounded_channel();
        let gateway = self.factory.build(guild_id, sender.clone());
        let player = GuildPlayer::new(
            guild_id,
            gateway,
            self.announcer.clone(),
            &self.settings,
            &sender,
        );
        tokio::spawn(playback::run(player, inbox));
        info!("Created player for guild {}", guild_id);
        GuildPlayerHandle::new(guild_id, sender)
    }
}
