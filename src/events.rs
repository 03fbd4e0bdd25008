//! Gateway events the players need to hear about.

use poise::serenity_prelude as serenity;
use serenity::{ActivityData, FullEvent, Interaction};
use tracing::{debug, error, info};

use crate::commands::music::utils::button_controls::{CONTROL_PREFIX, PLAYLIST_MENU_ID};
use crate::commands::music::utils::component_handlers;
use crate::commands::music::utils::playback::PlayerMessage;
use crate::{Data, Error};

pub async fn handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
            ctx.set_activity(Some(ActivityData::listening("/play")));
        }
        FullEvent::VoiceStateUpdate { new, .. } => {
            let bot_id = ctx.cache.current_user().id;
            if new.user_id != bot_id || new.channel_id.is_some() {
                return Ok(());
            }
            if let Some(player) = new.guild_id.and_then(|id| data.registry.existing(id)) {
                debug!("Bot left voice in guild {}", player.guild_id());
                player.notify(PlayerMessage::Disconnected);
            }
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            let custom_id = component.data.custom_id.as_str();
            if custom_id.starts_with(CONTROL_PREFIX) || custom_id == PLAYLIST_MENU_ID {
                if let Err(e) = component_handlers::handle_interaction(ctx, data, component).await {
                    error!("Failed to handle component {}: {}", custom_id, e);
                }
            }
        }
        FullEvent::GuildDelete { incomplete, .. } => {
            // Outages mark guilds unavailable without removing the bot.
            if !incomplete.unavailable {
                data.registry.remove(incomplete.id);
            }
        }
        _ => {}
    }
    Ok(())
}
