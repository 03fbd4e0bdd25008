use super::*;
use tracing::info;

/// Stop the music, clear the queue, and leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;

    let Some(player) = ctx.data().registry.existing(guild_id) else {
        ctx.send(embedded_messages::bot_not_in_voice_channel())
            .await?;
        return Ok(());
    };

    match player.stop().await {
        Ok(outcome) => {
            info!(
                "Stop in guild {}: {} tracks cleared, connected: {}",
                guild_id, outcome.cleared, outcome.was_connected
            );
            ctx.send(embedded_messages::stopped(&outcome)).await?;
        }
        Err(err) => reply_error(ctx, &err).await?,
    }

    Ok(())
}
