use poise::CreateReply;
use tracing::{error, info};

use crate::{CommandResult, Context};

/// Re-register the slash commands with Discord
#[poise::command(slash_command, owners_only, hide_in_help, category = "Admin")]
pub async fn sync(ctx: Context<'_>) -> CommandResult {
    let commands = &ctx.framework().options().commands;

    let reply = match poise::builtins::register_globally(ctx.serenity_context(), commands).await {
        Ok(()) => {
            let count = poise::builtins::create_application_commands(commands).len();
            info!("Synced {} commands on request of {}", count, ctx.author().name);
            format!("✅ Synced {} commands!", count)
        }
        Err(e) => {
            error!("Failed to sync commands: {}", e);
            format!("❌ Failed to sync commands: {}", e)
        }
    };

    ctx.send(CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}
