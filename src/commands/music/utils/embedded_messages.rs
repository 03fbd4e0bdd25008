use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{
    CreateEmbed, CreateEmbedFooter, CreateInteractionResponseMessage, CreateMessage,
};

use crate::commands::music::audio_sources::spotify::SpotifyPlaylist;
use crate::commands::music::audio_sources::track_metadata::TrackDescriptor;
use crate::commands::music::audio_sources::ResolvedPlaylist;

use super::button_controls::{create_music_control_buttons, create_playlist_menu};
use super::component_handlers::ControlOutcome;
use super::format_duration;
use super::music_manager::MusicError;
use super::playback::{Notice, QueueSnapshot, SkipOutcome, StopOutcome};
use super::queue_manager::PlaybackStatus;

/// Entries listed per `/queue` page
pub const QUEUE_PAGE_SIZE: usize = 10;
/// Playlists shown as embed fields by `/tneu`
pub const PLAYLIST_FIELDS: usize = 10;

/// Discord's limit on a single embed field value
const FIELD_VALUE_LIMIT: usize = 1024;
/// Longest title or artist shown in a queue line
const QUEUE_TEXT_LIMIT: usize = 60;
/// Queue lines longer than this lose their link
const QUEUE_LINE_LIMIT: usize = 200;

const SUCCESS: u32 = 0x00ff00;
const FAILURE: u32 = 0xff0000;
const QUEUE_COLOR: u32 = 0x1DB954;

fn duration_label(track: &TrackDescriptor) -> String {
    track
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "Unknown duration".to_string())
}

fn track_link(track: &TrackDescriptor) -> String {
    format!("[{}]({})", track.title, track.origin_url)
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Join lines into field values that each stay within `limit` characters.
/// A single line longer than `limit` is cut.
fn field_chunks(lines: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in lines {
        let line = truncate(line, limit);
        let line_len = line.chars().count();
        if current_len > 0 && current_len + 1 + line_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
    }
    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

fn track_embed(title: &str, track: &TrackDescriptor) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(title)
        .description(track_link(track))
        .field("Duration", format!("`{}`", duration_label(track)), true)
        .color(SUCCESS)
        .footer(CreateEmbedFooter::new(format!(
            "Requested by {} • {}",
            track.requested_by, track.source_kind
        )));
    if let Some(artist) = &track.artist {
        embed = embed.field("Artist", artist, true);
    }
    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Create an embed for when a song is now playing
pub fn now_playing(track: &TrackDescriptor) -> CreateEmbed {
    track_embed("🎵 Now Playing", track)
}

/// Now Playing reply with the control buttons attached
pub fn now_playing_reply(track: &TrackDescriptor) -> CreateReply {
    CreateReply::default()
        .embed(now_playing(track))
        .components(create_music_control_buttons(false))
}

/// Create an embed for when a song is added to the queue
pub fn added_to_queue(track: &TrackDescriptor, position: usize) -> CreateEmbed {
    track_embed("🎵 Added to Queue", track).field("Position", format!("`#{}`", position), true)
}

/// Reply for `/skip`
pub fn skipped(outcome: &SkipOutcome) -> CreateReply {
    let mut description = format!("⏭️ Skipped {}", track_link(&outcome.skipped));
    match &outcome.next {
        Some(next) => description.push_str(&format!("\n**Up next:** {}", track_link(next))),
        None => description.push_str("\n🎵 Queue finished!"),
    }
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏭️ Skipped")
            .description(description)
            .color(SUCCESS),
    )
}

/// Reply for `/stop`
pub fn stopped(outcome: &StopOutcome) -> CreateReply {
    if !outcome.was_connected && outcome.stopped.is_none() {
        return bot_not_in_voice_channel();
    }
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🛑 Stopped")
            .description("Stopped playing and cleared queue!")
            .color(SUCCESS),
    )
}

/// Create an embed for when a track is paused
pub fn paused(track: &TrackDescriptor) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⏸️ Paused")
            .description(format!("Paused {}", track_link(track)))
            .color(SUCCESS),
    )
}

/// Create an embed for when a track is resumed
pub fn resumed(track: &TrackDescriptor) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("▶️ Resumed")
            .description(format!("Resumed {}", track_link(track)))
            .color(SUCCESS),
    )
}

pub fn volume_set(percent: u8) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("🔊 Volume")
            .description(format!("Volume set to `{}%`", percent))
            .color(SUCCESS),
    )
}

/// Bounds of a 1-based queue page: `(start, end, total_pages)`, with `end`
/// exclusive. `None` when the page does not exist. An empty queue still has
/// one (empty) page.
pub fn page_bounds(len: usize, page: usize, per_page: usize) -> Option<(usize, usize, usize)> {
    let total_pages = len.div_ceil(per_page).max(1);
    if page == 0 || page > total_pages {
        return None;
    }
    let start = (page - 1) * per_page;
    Some((start, (start + per_page).min(len), total_pages))
}

/// One page of the `/queue` listing
pub fn queue_page(snapshot: &QueueSnapshot, page: usize) -> Result<CreateEmbed, MusicError> {
    let (start, end, total_pages) = page_bounds(snapshot.upcoming.len(), page, QUEUE_PAGE_SIZE)
        .ok_or(MusicError::InvalidPage {
            page,
            total_pages: snapshot.upcoming.len().div_ceil(QUEUE_PAGE_SIZE).max(1),
        })?;

    let mut embed = CreateEmbed::new().title("🎵 Music Queue").color(QUEUE_COLOR);

    match &snapshot.current {
        Some(current) => {
            let state = if snapshot.status == PlaybackStatus::Paused {
                " (paused)"
            } else {
                ""
            };
            embed = embed
                .field(
                    format!("Now Playing{}", state),
                    truncate(&track_link(current), FIELD_VALUE_LIMIT),
                    false,
                )
                .field(
                    "Artist",
                    truncate(
                        current.artist.as_deref().unwrap_or("Unknown"),
                        FIELD_VALUE_LIMIT,
                    ),
                    true,
                )
                .field("Duration", duration_label(current), true);
        }
        None => embed = embed.field("Now Playing", "🔇 Nothing playing", false),
    }

    if snapshot.upcoming.is_empty() {
        embed = embed.field("Up Next", "📭 Queue is empty", false);
    } else {
        let lines: Vec<String> = snapshot.upcoming[start..end]
            .iter()
            .enumerate()
            .map(|(offset, track)| queue_line(start + offset + 1, track))
            .collect();
        for (index, chunk) in field_chunks(&lines, FIELD_VALUE_LIMIT).into_iter().enumerate() {
            let name = if index == 0 {
                format!("Up Next (Page {}/{})", page, total_pages)
            } else {
                "Up Next (cont.)".to_string()
            };
            embed = embed.field(name, chunk, false);
        }
    }

    let mut footer = format!(
        "🎵 TNEU Music Bot • {} songs in queue",
        snapshot.upcoming.len()
    );
    // Add total duration if available
    if snapshot.upcoming_duration.as_secs() > 0 {
        footer.push_str(&format!(
            " ({} total)",
            format_duration(snapshot.upcoming_duration)
        ));
    }
    footer.push_str(&format!(
        " • Page {}/{} • Volume {}%",
        page, total_pages, snapshot.volume
    ));

    Ok(embed.footer(CreateEmbedFooter::new(footer)))
}

/// A single numbered queue entry. Titles and artists are shortened, and a
/// line that is still too long is listed without its link.
pub fn queue_line(position: usize, track: &TrackDescriptor) -> String {
    let title = truncate(&track.title, QUEUE_TEXT_LIMIT);
    let mut line = format!("`{}.` [{}]({})", position, title, track.origin_url);
    if line.chars().count() > QUEUE_LINE_LIMIT {
        line = format!("`{}.` {}", position, title);
    }
    if let Some(artist) = &track.artist {
        line.push_str(&format!(" - {}", truncate(artist, QUEUE_TEXT_LIMIT)));
    }
    if let Some(duration) = track.duration {
        line.push_str(&format!(" `{}`", format_duration(duration)));
    }
    line
}

/// Embed posted in the text channel for player notices
pub fn notice(notice: &Notice) -> CreateEmbed {
    match notice {
        Notice::NowPlaying(track) => now_playing(track),
        Notice::TrackFailed { track, error } => CreateEmbed::new()
            .title("❌ Error")
            .description(format!("Could not play {}: {}", track_link(track), error))
            .color(FAILURE),
        Notice::QueueFinished => CreateEmbed::new()
            .title("🎵 Queue finished!")
            .description("Use `/play` to add more songs.")
            .color(SUCCESS),
        Notice::LeftIdle => CreateEmbed::new()
            .title("👋 Left voice channel")
            .description("Nothing was playing for a while.")
            .color(SUCCESS),
    }
}

/// Message posted in the text channel for a player notice. Now Playing
/// notices carry the control buttons.
pub fn notice_message(event: &Notice) -> CreateMessage {
    let message = CreateMessage::new().embed(notice(event));
    match event {
        Notice::NowPlaying(_) => message.components(create_music_control_buttons(false)),
        _ => message,
    }
}

/// The Now Playing message after a control button was handled
pub fn control_update(outcome: &ControlOutcome) -> CreateInteractionResponseMessage {
    let message = CreateInteractionResponseMessage::new();
    match outcome {
        ControlOutcome::Paused(track) => message
            .embed(now_playing(track))
            .components(create_music_control_buttons(true)),
        ControlOutcome::Resumed(track) => message
            .embed(now_playing(track))
            .components(create_music_control_buttons(false)),
        ControlOutcome::Refreshed { track, paused } => message
            .embed(now_playing(track))
            .components(create_music_control_buttons(*paused)),
        ControlOutcome::Skipped(SkipOutcome {
            next: Some(next), ..
        }) => message
            .embed(now_playing(next))
            .components(create_music_control_buttons(false)),
        ControlOutcome::Skipped(SkipOutcome { next: None, .. }) => message
            .embed(notice(&Notice::QueueFinished))
            .components(Vec::new()),
        ControlOutcome::Stopped(_) => message
            .embed(
                CreateEmbed::new()
                    .title("🛑 Stopped")
                    .description("Stopped playing and cleared queue!")
                    .color(SUCCESS),
            )
            .components(Vec::new()),
    }
}

/// Short ephemeral confirmation for the user who pressed a control button
pub fn control_feedback(outcome: &ControlOutcome) -> String {
    match outcome {
        ControlOutcome::Paused(_) => "⏸️ Music paused!".to_string(),
        ControlOutcome::Resumed(_) => "▶️ Music resumed!".to_string(),
        ControlOutcome::Skipped(SkipOutcome {
            next: Some(next), ..
        }) => format!("⏭️ Skipped! Now playing: **{}**", next.display_name()),
        ControlOutcome::Skipped(SkipOutcome { next: None, .. }) => {
            "⏭️ Song skipped! Queue is now empty.".to_string()
        }
        ControlOutcome::Stopped(_) => "⏹️ Music stopped and queue cleared!".to_string(),
        ControlOutcome::Refreshed { .. } => "🔄 Control panel refreshed!".to_string(),
    }
}

/// Ephemeral answer to a component interaction that failed
pub fn interaction_error(err: &MusicError) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .embed(error_embed(err))
        .ephemeral(true)
}

/// `/tneu` listing: the first playlists as fields plus a menu to pick one
pub fn spotify_playlists(playlists: &[SpotifyPlaylist]) -> CreateReply {
    let mut embed = CreateEmbed::new()
        .title("🎵 Your Spotify Playlists")
        .description("Select a playlist from the menu below to add all of its songs to the queue!")
        .color(QUEUE_COLOR);

    for (index, playlist) in playlists.iter().take(PLAYLIST_FIELDS).enumerate() {
        let visibility = if playlist.public {
            "🌐 Public"
        } else {
            "🔒 Private"
        };
        embed = embed.field(
            truncate(&format!("{}. {}", index + 1, playlist.name), 256),
            truncate(
                &format!(
                    "🎵 {} tracks • {}\n👤 {}",
                    playlist.track_count, visibility, playlist.owner
                ),
                FIELD_VALUE_LIMIT,
            ),
            false,
        );
    }

    let footer = if playlists.len() > PLAYLIST_FIELDS {
        format!(
            "Showing {} of {} playlists",
            PLAYLIST_FIELDS,
            playlists.len()
        )
    } else {
        format!("Total: {} playlists", playlists.len())
    };

    CreateReply::default()
        .embed(embed.footer(CreateEmbedFooter::new(footer)))
        .components(create_playlist_menu(playlists))
}

pub fn no_playlists() -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ No Playlists")
                .description("No public playlists were found on the Spotify account.")
                .color(FAILURE),
        )
        .ephemeral(true)
}

/// Result of queueing a picked playlist
pub fn playlist_queued(
    playlist: &ResolvedPlaylist,
    queued: usize,
    started: Option<&TrackDescriptor>,
) -> CreateEmbed {
    let mut description = format!(
        "✅ Added **{}** songs from **{}** to the queue!",
        queued, playlist.name
    );
    if let Some(track) = started {
        description.push_str(&format!("\n🎵 Now playing: {}", track_link(track)));
    }
    if playlist.missed > 0 {
        description.push_str(&format!(
            "\n⚠️ {} songs could not be found on YouTube",
            playlist.missed
        ));
    }
    CreateEmbed::new()
        .title("🎵 Playlist Added")
        .description(description)
        .color(SUCCESS)
}

pub fn error_embed(err: &MusicError) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(err.to_string())
        .color(FAILURE)
}

/// Ephemeral error reply for a failed music command
pub fn music_error(err: &MusicError) -> CreateReply {
    CreateReply::default()
        .embed(error_embed(err))
        .ephemeral(true)
}

/// Create an embed for when the bot is not connected to a voice channel
pub fn bot_not_in_voice_channel() -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description("I'm not connected to a voice channel!")
                .color(FAILURE),
        )
        .ephemeral(true)
}

pub fn queue_is_empty() -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("📭 Queue is empty!")
                .description("Use `/play` to add a song.")
                .color(QUEUE_COLOR),
        )
        .ephemeral(true)
}

/// Generic reply when a command failed unexpectedly
pub fn unexpected_error() -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description("Something went wrong while running that command.")
                .color(FAILURE),
        )
        .ephemeral(true)
}
