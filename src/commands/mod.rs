//! This module aggregates all the command modules for the bot.

use tracing::{error, warn};

use crate::{Data, Error};

/// Owner-only maintenance commands.
pub mod admins;
/// General purpose commands (e.g., help).
pub mod general;
/// Commands related to music playback.
pub mod music;

/// Every command the bot registers with Discord.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        general::help::help(),
        admins::sync::sync(),
        music::play::play(),
        music::testyt::testyt(),
        music::tneu::tneu(),
        music::skip::skip(),
        music::stop::stop(),
        music::queue::queue(),
        music::pause::pause(),
        music::pause::resume(),
        music::volume::volume(),
    ]
}

/// Framework-wide error hook. Music errors are answered inside the commands,
/// so whatever reaches this point is unexpected.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Command `{}` failed: {}", ctx.command().name, error);
            if let Err(e) = ctx
                .send(music::utils::embedded_messages::unexpected_error())
                .await
            {
                warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling framework error: {}", e);
            }
        }
    }
}
