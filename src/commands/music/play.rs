use super::*;
use crate::commands::music::audio_sources::track_metadata::TrackDescriptor;
use crate::commands::music::utils::{
    music_manager::{MusicManager, VoiceError},
    playback::EnqueueOutcome,
};
use tracing::{info, warn};

/// Play a song from Spotify, YouTube or a search query
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song name, Spotify track link or YouTube link"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);
    let guild_id = guild_id(&ctx)?;

    // Get the user's voice channel
    let Some(voice_channel) =
        MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)
    else {
        return reply_error(ctx, &VoiceError::NoChannel.into()).await;
    };

    // Defer the response since resolving might take time
    ctx.defer().await?;

    let track = match ctx
        .data()
        .resolver
        .resolve(&query, &requester_name(&ctx))
        .await
    {
        Ok(track) => track,
        Err(err) => {
            warn!("Could not resolve `{}`: {}", query, err);
            return reply_error(ctx, &err.into()).await;
        }
    };

    enqueue_and_reply(ctx, guild_id, voice_channel, track).await
}

/// Hand a resolved track to the guild's player and report where it landed.
pub(super) async fn enqueue_and_reply(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    voice_channel: serenity::ChannelId,
    track: TrackDescriptor,
) -> CommandResult {
    let player = ctx.data().registry.player(guild_id);

    match player
        .enqueue(track, Some(voice_channel), ctx.channel_id())
        .await
    {
        Ok(EnqueueOutcome::NowPlaying(track)) => {
            ctx.send(embedded_messages::now_playing_reply(&track))
                .await?;
        }
        Ok(EnqueueOutcome::Queued { track, position }) => {
            ctx.send(
                CreateReply::default().embed(embedded_messages::added_to_queue(&track, position)),
            )
            .await?;
        }
        Err(err) => {
            warn!("Could not enqueue in guild {}: {}", guild_id, err);
            reply_error(ctx, &err).await?;
        }
    }

    Ok(())
}
