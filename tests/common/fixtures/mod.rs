//! Test fixtures: ids, tracks and settings shared by the integration tests

use poise::serenity_prelude::{ChannelId, GuildId};
use std::time::Duration;

use tneu_music::commands::music::audio_sources::track_metadata::{SourceKind, TrackDescriptor};
use tneu_music::commands::music::utils::playback::PlayerSettings;

pub const GUILD_ID: u64 = 111_111_111;
pub const OTHER_GUILD_ID: u64 = 222_222_222;
pub const VOICE_CHANNEL_ID: u64 = 333_333_333;
pub const OTHER_VOICE_CHANNEL_ID: u64 = 444_444_444;
pub const TEXT_CHANNEL_ID: u64 = 555_555_555;

pub fn guild() -> GuildId {
    GuildId::new(GUILD_ID)
}

pub fn other_guild() -> GuildId {
    GuildId::new(OTHER_GUILD_ID)
}

pub fn voice_channel() -> ChannelId {
    ChannelId::new(VOICE_CHANNEL_ID)
}

pub fn other_voice_channel() -> ChannelId {
    ChannelId::new(OTHER_VOICE_CHANNEL_ID)
}

pub fn text_channel() -> ChannelId {
    ChannelId::new(TEXT_CHANNEL_ID)
}

/// A resolved search result titled `title`
pub fn track(title: &str) -> TrackDescriptor {
    let url = format!(
        "https://www.youtube.com/watch?v={}",
        title.replace(' ', "_")
    );
    TrackDescriptor {
        title: title.to_string(),
        artist: Some("Test Artist".to_string()),
        source_kind: SourceKind::Search,
        stream_reference: url.clone(),
        origin_url: url,
        duration: Some(Duration::from_secs(180)),
        thumbnail: None,
        requested_by: "tester".to_string(),
    }
}

/// Settings with the idle disconnect turned off
pub fn no_idle_timeout() -> PlayerSettings {
    PlayerSettings {
        idle_timeout: None,
        default_volume: 50,
    }
}

pub fn idle_timeout(after: Duration) -> PlayerSettings {
    PlayerSettings {
        idle_timeout: Some(after),
        default_volume: 50,
    }
}
