pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod queue;
pub(crate) mod skip;
pub(crate) mod stop;
pub(crate) mod testyt;
pub(crate) mod tneu;
pub(crate) mod volume;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context};
use poise::{CreateReply, serenity_prelude as serenity};
use utils::{embedded_messages, music_manager::MusicError};

/// Guild of the invocation. All music commands are `guild_only`, so this only
/// fails if Discord sends a guild command from a DM.
fn guild_id(ctx: &Context<'_>) -> Result<serenity::GuildId, MusicError> {
    ctx.guild_id().ok_or(MusicError::NotInGuild)
}

/// Display name used for "Requested by".
fn requester_name(ctx: &Context<'_>) -> String {
    ctx.author().display_name().to_string()
}

async fn reply_error(ctx: Context<'_>, err: &MusicError) -> CommandResult {
    ctx.send(embedded_messages::music_error(err)).await?;
    Ok(())
}
