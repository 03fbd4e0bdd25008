use super::*;
use crate::commands::music::audio_sources::youtube::YoutubeApi;
use crate::commands::music::utils::music_manager::{MusicManager, VoiceError};
use tracing::info;

/// Test YouTube streaming with a direct URL
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn testyt(
    ctx: Context<'_>,
    #[description = "YouTube video URL"] url: String,
) -> CommandResult {
    info!("Received testyt command with url: {}", url);
    let guild_id = guild_id(&ctx)?;

    let Some(voice_channel) =
        MusicManager::get_user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id)
    else {
        return reply_error(ctx, &VoiceError::NoChannel.into()).await;
    };

    let url = url.trim().to_string();
    if !YoutubeApi::is_direct_link(&url) {
        return reply_error(ctx, &MusicError::InvalidYoutubeUrl).await;
    }

    ctx.defer().await?;

    let track = match ctx
        .data()
        .resolver
        .direct_youtube(&url, &requester_name(&ctx))
        .await
    {
        Ok(track) => track,
        Err(err) => return reply_error(ctx, &err.into()).await,
    };

    super::play::enqueue_and_reply(ctx, guild_id, voice_channel, track).await
}
