use super::*;
use crate::commands::music::utils::music_manager::{MusicManager, VoiceError};
use tracing::{info, warn};

/// Show the TNEU Spotify playlists and queue one of them
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn tneu(ctx: Context<'_>) -> CommandResult {
    info!("Received tneu command from {}", ctx.author().name);
    let guild_id = guild_id(&ctx)?;

    if MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)
        .is_none()
    {
        return reply_error(ctx, &VoiceError::NoChannel.into()).await;
    }

    ctx.defer().await?;

    let playlists = match ctx.data().resolver.user_playlists().await {
        Ok(playlists) => playlists,
        Err(err) => {
            warn!("Could not list Spotify playlists: {}", err);
            return reply_error(ctx, &err.into()).await;
        }
    };

    if playlists.is_empty() {
        ctx.send(embedded_messages::no_playlists()).await?;
        return Ok(());
    }

    ctx.send(embedded_messages::spotify_playlists(&playlists))
        .await?;
    Ok(())
}
