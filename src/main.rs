use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tneu_music::commands::{
    self,
    music::{
        audio_sources::TrackResolver,
        utils::{
            music_manager::{ChannelAnnouncer, MusicManager, SongbirdGatewayFactory},
            registry::GuildRegistry,
        },
    },
};
use tneu_music::{Data, Error, config::Config, events};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tneu_music=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);
    if config.spotify.is_none() {
        warn!("Spotify credentials not set, Spotify links will be rejected");
    } else if config.spotify_user_id.is_none() {
        warn!("SPOTIFY_USER_ID not set, /tneu has no playlists to list");
    }

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let http_client = reqwest::Client::new();
    let resolver = Arc::new(TrackResolver::from_config(&config, http_client.clone()));
    let settings = config.player_settings();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            owners: config.owner_id.into_iter().collect(),
            on_error: |error| Box::pin(commands::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let songbird = MusicManager::get_songbird(ctx).await?;
                let registry = Arc::new(GuildRegistry::new(
                    Arc::new(SongbirdGatewayFactory::new(songbird, http_client.clone())),
                    Arc::new(ChannelAnnouncer::new(ctx.http.clone())),
                    settings,
                ));

                let shutdown_registry = registry.clone();
                let shard_manager = framework.shard_manager().clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Ctrl-C received, leaving all voice channels");
                        shutdown_registry.shutdown_all().await;
                        shard_manager.shutdown_all().await;
                    }
                });

                Ok(Data { registry, resolver })
            })
        })
        .build();

    // Create and run client
    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird()
        .await?;
    client.start().await.map_err(Into::into)
}
