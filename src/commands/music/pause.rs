use super::*;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;

    let Some(player) = ctx.data().registry.existing(guild_id) else {
        return reply_error(ctx, &MusicError::NothingPlaying).await;
    };

    match player.pause().await {
        Ok(track) => {
            ctx.send(embedded_messages::paused(&track)).await?;
        }
        Err(err) => reply_error(ctx, &err).await?,
    }

    Ok(())
}

/// Resume the paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = guild_id(&ctx)?;

    let Some(player) = ctx.data().registry.existing(guild_id) else {
        return reply_error(ctx, &MusicError::NothingPlaying).await;
    };

    match player.resume().await {
        Ok(track) => {
            ctx.send(embedded_messages::resumed(&track)).await?;
        }
        Err(err) => reply_error(ctx, &err).await?,
    }

    Ok(())
}
