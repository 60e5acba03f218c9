// This is the entry point of the swindler-guard bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (database, classifier API)
// - `telegram/` = Telegram-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Wire up the dispatcher
// 4. Run the long-poll loop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "telegram/telegram_layer.rs"]
mod telegram;

use crate::core::consensus::{ConsensusConfig, ConsensusService};
use crate::core::enforcement::EnforcementService;
use crate::core::moderation::{ModerationConfig, ModerationService};
use crate::infra::classifier::HttpClassifier;
use crate::infra::moderation::SqliteIncidentStore;
use crate::infra::session::SqliteSessionStore;
use crate::telegram::transport::TelegramTransport;
use crate::telegram::{commands, message_handler, poll_handler, BotDeps};
use anyhow::Context;
use std::sync::Arc;
use teloxide::prelude::*;

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Reads TELOXIDE_TOKEN.
    let bot = Bot::from_env();

    let classifier_url = std::env::var("CLASSIFIER_URL")
        .context("Missing CLASSIFIER_URL environment variable! The bot needs a scoring service.")?;
    let classifier_key = std::env::var("CLASSIFIER_API_KEY").ok();

    // Thresholds are tunables, not constants; env vars override the defaults.
    let defaults = ModerationConfig::default();
    let moderation_config = ModerationConfig {
        low_threshold: env_f64("SCORE_LOW_THRESHOLD", defaults.low_threshold),
        high_threshold: env_f64("SCORE_HIGH_THRESHOLD", defaults.high_threshold),
        mute_duration_secs: env_u64("MUTE_DURATION_SECS", defaults.mute_duration_secs),
        repeat_window_secs: env_u64("REPEAT_WINDOW_SECS", defaults.repeat_window_secs),
        classifier_timeout_ms: env_u64("CLASSIFIER_TIMEOUT_MS", defaults.classifier_timeout_ms),
    };
    let consensus_defaults = ConsensusConfig::default();
    let consensus_config = ConsensusConfig {
        approve_ratio: env_f64("CONSENSUS_THRESHOLD", consensus_defaults.approve_ratio),
        poll_ttl_secs: env_u64("POLL_TTL_SECS", consensus_defaults.poll_ttl_secs),
    };

    // Keep the runtime database in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    let db_path = format!("{}/swindler_guard.db", data_dir);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await
        .context("Failed to connect to the moderation DB")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let session_store = Arc::new(SqliteSessionStore::new(pool.clone()));
    session_store.migrate().await?;

    let incident_store = SqliteIncidentStore::new(pool.clone());
    incident_store.migrate().await?;

    let classifier = HttpClassifier::new(classifier_url, classifier_key);
    let moderation_service = Arc::new(ModerationService::new(
        classifier,
        incident_store,
        moderation_config,
    ));

    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let consensus_service = Arc::new(ConsensusService::new(
        Arc::clone(&transport),
        consensus_config,
    ));
    // Duplicate decisions within a 10 minute bucket are enforced once.
    let enforcement_service = Arc::new(EnforcementService::new(Arc::clone(&transport), 600));

    let deps = BotDeps {
        sessions: Arc::clone(&session_store),
        moderation: Arc::clone(&moderation_service),
        consensus: Arc::clone(&consensus_service),
        enforcer: Arc::clone(&enforcement_service),
        transport: Arc::clone(&transport),
    };

    // Background sweep for expired polls, old dedup buckets and stale
    // incident rows. Runs every 10 minutes.
    {
        let consensus = Arc::clone(&consensus_service);
        let enforcer = Arc::clone(&enforcement_service);
        let moderation = Arc::clone(&moderation_service);
        tokio::spawn(async move {
            use std::time::Duration as StdDuration;
            use tokio::time::sleep;

            loop {
                sleep(StdDuration::from_secs(600)).await;
                let now = chrono::Utc::now();
                consensus.sweep_expired(now);
                enforcer.sweep_ledger(now);
                if let Err(err) = moderation.sweep_expired_incidents().await {
                    tracing::warn!("incident sweep failed: {err}");
                }
            }
        });
    }

    // ========================================================================
    // DISPATCHER SETUP
    // ========================================================================

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<commands::Command>()
                .endpoint(commands::handle_command),
        )
        .branch(Update::filter_message().endpoint(message_handler::handle_message))
        .branch(Update::filter_poll().endpoint(poll_handler::handle_poll_update));

    tracing::info!("swindler guard starting");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![deps])
        .default_handler(|update| async move {
            tracing::trace!(?update, "unhandled update");
        })
        // Nothing in the pipeline is fatal; log it and keep serving.
        .error_handler(
            teloxide::error_handlers::LoggingErrorHandler::with_custom_text(
                "error while handling update",
            ),
        )
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
