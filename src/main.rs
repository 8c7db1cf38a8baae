// This is the entry point of the moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (JSON file, SQLite)
// - `discord/` = Discord-specific adapters (commands, events, effects)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Shut everything down in order

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;
mod settings;

use crate::core::moderation::{spawn_sweeper, ModerationService, WarnStore, SPAM_SWEEP_INTERVAL};
use crate::discord::moderation::handle_message_for_moderation;
use crate::discord::{Data, Error};
use crate::infra::guild_config::JsonGuildStore;
use crate::infra::moderation::{load_global_bad_words, SqliteWarnStore};
use crate::settings::{BotSettings, WarnBackend};
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for sanctions that are still running.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Event handler for non-command Discord events.
/// Every guild message goes through automated moderation.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        // One failed message must not stop the others
        if let Err(e) =
            handle_message_for_moderation(ctx, new_message, &framework.options().owners, data)
                .await
        {
            tracing::error!("Moderation failed for message {}: {}", new_message.id, e);
        }
    }

    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                "Command failed: {}",
                error
            );
            if let Err(e) = ctx
                .send(
                    poise::CreateReply::default()
                        .content("❌ Something went wrong while running this command.")
                        .ephemeral(true),
                )
                .await
            {
                tracing::warn!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();
    init_tracing();

    let settings = BotSettings::from_env()?;

    // Keep runtime data in a dedicated folder so the repo root stays tidy.
    tokio::fs::create_dir_all(&settings.data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {}", settings.data_dir.display()))?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let guild_store = Arc::new(
        JsonGuildStore::open(settings.guild_store_path())
            .await
            .context("Failed to open guild store")?,
    );

    let warn_store = match settings.warn_backend {
        WarnBackend::Json => Arc::clone(&guild_store) as Arc<dyn WarnStore>,
        WarnBackend::Sqlite => {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .connect(&settings.warn_db_url())
                .await
                .context("Failed to connect to moderation DB")?;
            let store = SqliteWarnStore::new(pool);
            store
                .migrate()
                .await
                .context("Failed to migrate moderation DB")?;
            Arc::new(store) as Arc<dyn WarnStore>
        }
    };
    tracing::info!(backend = ?settings.warn_backend, "Warn ledger ready");

    let global_words = Arc::new(load_global_bad_words(&settings.bad_words_path).await);

    let moderation = Arc::new(ModerationService::new(
        guild_store,
        warn_store,
        global_words,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(moderation.spam_windows(), SPAM_SWEEP_INTERVAL, shutdown_rx);

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let mut owners = HashSet::new();
    if let Some(owner_id) = settings.owner_id {
        owners.insert(serenity::UserId::new(owner_id));
    }

    let data_service = Arc::clone(&moderation);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::moderation::commands::moderation(),
                discord::moderation::commands::warnings(),
                discord::moderation::commands::clearwarns(),
                discord::moderation::manual::kick(),
                discord::moderation::manual::ban(),
                discord::moderation::manual::unban(),
                discord::moderation::manual::purge(),
                discord::moderation::manual::nuke(),
            ],
            // The application owner is added on startup as well
            owners,
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("Connected as {}", ready.user.name);

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                Ok(Data {
                    moderation: data_service,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&settings.token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                shard_manager.shutdown_all().await;
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    if let Err(e) = client.start().await {
        tracing::error!("Client stopped with error: {}", e);
    }

    // ========================================================================
    // SHUTDOWN
    // ========================================================================

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!("Spam window sweeper ended abnormally: {}", e);
    }

    if moderation.drain(DRAIN_TIMEOUT).await {
        tracing::info!("All sanctions finished");
    } else {
        tracing::warn!("Gave up waiting for running sanctions");
    }

    Ok(())
}
