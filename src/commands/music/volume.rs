use super::*;

/// Set the playback volume
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume level (0-100)"]
    #[min = 0]
    #[max = 100]
    level: u8,
) -> CommandResult {
    let guild_id = guild_id(&ctx)?;
    let player = ctx.data().registry.player(guild_id);

    match player.set_volume(level).await {
        Ok(percent) => {
            ctx.send(embedded_messages::volume_set(percent)).await?;
        }
        Err(err) => reply_error(ctx, &err).await?,
    }

    Ok(())
}
