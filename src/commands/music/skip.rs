use super::*;

/// Skip the currently playing song
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;

    let Some(player) = ctx.data().registry.existing(guild_id) else {
        return reply_error(ctx, &MusicError::NothingPlaying).await;
    };

    match player.skip().await {
        Ok(outcome) => {
            ctx.send(embedded_messages::skipped(&outcome)).await?;
        }
        Err(err) => reply_error(ctx, &err).await?,
    }

    Ok(())
}
