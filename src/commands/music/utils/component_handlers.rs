//! Component interactions: the Now Playing buttons and the `/tneu` playlist menu.

use ::serenity::all::{
    ComponentInteraction, ComponentInteractionDataKind, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EditInteractionResponse,
};
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId};
use tracing::{info, warn};

use crate::commands::music::audio_sources::track_metadata::TrackDescriptor;
use crate::{Data, Error};

use super::button_controls::{ControlAction, PLAYLIST_MENU_ID, create_music_control_buttons};
use super::embedded_messages;
use super::music_manager::{MusicError, MusicManager, MusicResult, VoiceError};
use super::playback::{EnqueueOutcome, GuildPlayerHandle, SkipOutcome, StopOutcome};
use super::queue_manager::PlaybackStatus;

/// What a control button did
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    Paused(TrackDescriptor),
    Resumed(TrackDescriptor),
    Skipped(SkipOutcome),
    Stopped(StopOutcome),
    Refreshed {
        track: TrackDescriptor,
        paused: bool,
    },
}

/// Tracks handed to a player in one go
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedBatch {
    pub queued: usize,
    /// The track that started right away, if the guild was idle.
    pub started: Option<TrackDescriptor>,
}

/// Controls are only for listeners: the presser has to share the bot's
/// voice channel.
pub fn authorize_control(
    user_channel: Option<ChannelId>,
    bot_channel: Option<ChannelId>,
) -> MusicResult<ChannelId> {
    let user_channel = user_channel.ok_or(VoiceError::NoChannel)?;
    let bot_channel = bot_channel.ok_or(VoiceError::NotConnected)?;
    if user_channel != bot_channel {
        return Err(VoiceError::NotListening.into());
    }
    Ok(bot_channel)
}

/// Run a control button against the guild's player
pub async fn apply_control(
    player: &GuildPlayerHandle,
    action: ControlAction,
) -> MusicResult<ControlOutcome> {
    match action {
        ControlAction::TogglePause => {
            let (track, status) = player.toggle_pause().await?;
            Ok(if status == PlaybackStatus::Paused {
                ControlOutcome::Paused(track)
            } else {
                ControlOutcome::Resumed(track)
            })
        }
        ControlAction::Skip => player.skip().await.map(ControlOutcome::Skipped),
        ControlAction::Stop => player.stop().await.map(ControlOutcome::Stopped),
        ControlAction::Refresh => {
            let snapshot = player.snapshot().await?;
            let track = snapshot.current.ok_or(MusicError::NothingPlaying)?;
            Ok(ControlOutcome::Refreshed {
                track,
                paused: snapshot.status == PlaybackStatus::Paused,
            })
        }
    }
}

/// Enqueue `tracks` in order. Entries that fail to stream are skipped. Any
/// other error ends the batch, and is returned if nothing was queued yet.
pub async fn enqueue_all(
    player: &GuildPlayerHandle,
    tracks: Vec<TrackDescriptor>,
    voice_channel: ChannelId,
    text_channel: ChannelId,
) -> MusicResult<QueuedBatch> {
    let mut batch = QueuedBatch {
        queued: 0,
        started: None,
    };
    for track in tracks {
        match player.enqueue(track, Some(voice_channel), text_channel).await {
            Ok(EnqueueOutcome::NowPlaying(track)) => {
                batch.queued += 1;
                batch.started = Some(track);
            }
            Ok(EnqueueOutcome::Queued { .. }) => batch.queued += 1,
            Err(MusicError::Playback(e)) => {
                warn!("Skipping playlist entry in guild {}: {}", player.guild_id(), e);
            }
            Err(e) if batch.queued == 0 => return Err(e),
            Err(e) => {
                warn!(
                    "Stopped queueing playlist in guild {} after {} songs: {}",
                    player.guild_id(),
                    batch.queued,
                    e
                );
                break;
            }
        }
    }
    Ok(batch)
}

/// Handle a button or select menu interaction
pub async fn handle_interaction(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &ComponentInteraction,
) -> Result<(), Error> {
    let Some(guild_id) = interaction.guild_id else {
        return respond_error(ctx, interaction, &MusicError::NotInGuild).await;
    };

    if interaction.data.custom_id == PLAYLIST_MENU_ID {
        return handle_playlist_pick(ctx, data, interaction, guild_id).await;
    }

    let Some(action) = ControlAction::from_custom_id(&interaction.data.custom_id) else {
        warn!("Unknown component id: {}", interaction.data.custom_id);
        return Ok(());
    };
    info!(
        "Control {:?} pressed by {} in guild {}",
        action, interaction.user.name, guild_id
    );

    let bot_id = ctx.cache.current_user().id;
    let authorized = authorize_control(
        MusicManager::get_user_voice_channel(ctx, guild_id, interaction.user.id),
        MusicManager::get_user_voice_channel(ctx, guild_id, bot_id),
    );
    let outcome = match authorized {
        Ok(_) => match data.registry.existing(guild_id) {
            Some(player) => apply_control(&player, action).await,
            None => Err(MusicError::NothingPlaying),
        },
        Err(err) => Err(err),
    };

    match outcome {
        Ok(outcome) => {
            interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::UpdateMessage(embedded_messages::control_update(
                        &outcome,
                    )),
                )
                .await?;
            interaction
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(embedded_messages::control_feedback(&outcome))
                        .ephemeral(true),
                )
                .await?;
            Ok(())
        }
        Err(err) => respond_error(ctx, interaction, &err).await,
    }
}

/// A playlist was picked from the `/tneu` menu: search every entry and queue
/// the matches.
async fn handle_playlist_pick(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &ComponentInteraction,
    guild_id: GuildId,
) -> Result<(), Error> {
    let ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind else {
        warn!("Playlist menu sent a non-string selection");
        return Ok(());
    };
    let Some(playlist_id) = values.first() else {
        return Ok(());
    };

    let Some(voice_channel) =
        MusicManager::get_user_voice_channel(ctx, guild_id, interaction.user.id)
    else {
        return respond_error(ctx, interaction, &VoiceError::NoChannel.into()).await;
    };

    // Searching a whole playlist takes a while
    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    info!("Queueing Spotify playlist {} in guild {}", playlist_id, guild_id);
    let requested_by = interaction.user.display_name().to_string();
    let result = match data
        .resolver
        .resolve_playlist(playlist_id, &requested_by)
        .await
    {
        Ok(playlist) => {
            let player = data.registry.player(guild_id);
            enqueue_all(
                &player,
                playlist.tracks.clone(),
                voice_channel,
                interaction.channel_id,
            )
            .await
            .map(|batch| (playlist, batch))
        }
        Err(err) => Err(err.into()),
    };

    let response = match result {
        Ok((playlist, batch)) => {
            let embed =
                embedded_messages::playlist_queued(&playlist, batch.queued, batch.started.as_ref());
            let response = EditInteractionResponse::new().embed(embed);
            if batch.started.is_some() {
                response.components(create_music_control_buttons(false))
            } else {
                response
            }
        }
        Err(err) => {
            warn!("Could not queue playlist {}: {}", playlist_id, err);
            EditInteractionResponse::new().embed(embedded_messages::error_embed(&err))
        }
    };
    interaction.edit_response(&ctx.http, response).await?;
    Ok(())
}

async fn respond_error(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    err: &MusicError,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(embedded_messages::interaction_error(err)),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const LOUNGE: ChannelId = ChannelId::new(1);
    const STAGE: ChannelId = ChannelId::new(2);

    #[test_case(Some(LOUNGE), Some(LOUNGE) => Ok(LOUNGE); "same channel")]
    #[test_case(None, Some(LOUNGE) => Err(MusicError::Voice(VoiceError::NoChannel)); "user not in voice")]
    #[test_case(Some(LOUNGE), None => Err(MusicError::Voice(VoiceError::NotConnected)); "bot not in voice")]
    #[test_case(Some(STAGE), Some(LOUNGE) => Err(MusicError::Voice(VoiceError::NotListening)); "different channel")]
    fn test_authorize_control(
        user: Option<ChannelId>,
        bot: Option<ChannelId>,
    ) -> MusicResult<ChannelId> {
        authorize_control(user, bot)
    }
}
