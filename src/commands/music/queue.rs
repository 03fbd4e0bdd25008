use super::*;

/// View the current music queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page number (10 songs per page)"]
    #[min = 1]
    page: Option<usize>,
) -> CommandResult {
    let guild_id = guild_id(&ctx)?;
    let page = page.unwrap_or(1);

    let snapshot = match ctx.data().registry.existing(guild_id) {
        Some(player) => match player.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => return reply_error(ctx, &err).await,
        },
        None => {
            ctx.send(embedded_messages::queue_is_empty()).await?;
            return Ok(());
        }
    };

    if snapshot.is_empty() {
        ctx.send(embedded_messages::queue_is_empty()).await?;
        return Ok(());
    }

    match embedded_messages::queue_page(&snapshot, page) {
        Ok(embed) => {
            ctx.send(CreateReply::default().embed(embed)).await?;
        }
        Err(err) => reply_error(ctx, &err).await?,
    }

    Ok(())
}
