/// Pickem — Bot
///
/// Co dělá:
///   1. Telegram `/pick` → validace → zápis tipů do Picks listu
///   2. Ráno (INSERT_WINDOW) vloží dnešní zápasy do Results
///   3. Večer (UPDATE_WINDOW) doplní skóre a status dohraných zápasů
///
/// Spuštění:
///   cargo run --bin pickem-bot

use anyhow::{Context, Result};
use dotenv::dotenv;
use feed_client::HockeyTechFeed;
use game_sync::{GameSyncEngine, SyncScheduler};
use logger::EventLogger;
use pick_ledger::PickService;
use pickem_live::telegram::TelegramBot;
use pickem_live::Config;
use std::env;
use std::fs::File;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cfg = Config::from_env()?;
    let token = cfg.telegram_token.clone().context("TELEGRAM_BOT_TOKEN is not set")?;

    info!("=== Pickem bot ===");
    info!("Spreadsheet: {} (tz {})", cfg.spreadsheet_id, cfg.tz);
    info!("Windows: insert {:?}, update {:?}, poll {}s",
        cfg.insert_window, cfg.update_window, cfg.poll_interval.as_secs());
    info!("Logs: {}", cfg.log_dir.display());

    // Single instance lock
    let lock_file_path = env::temp_dir().join(format!("pickem_{}.lock", cfg.spreadsheet_id));
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another pickem-bot is already running for this spreadsheet! Exiting.");
            return Ok(());
        }
    };

    let sheets = Arc::new(cfg.sheets_client()?);
    let feed = Arc::new(
        HockeyTechFeed::new(&cfg.feed_url, cfg.http_timeout).context("feed client")?,
    );

    let service = Arc::new(
        PickService::new(sheets.clone(), cfg.sheets.clone())
            .with_event_log(EventLogger::new(&cfg.log_dir)),
    );
    let engine = Arc::new(
        GameSyncEngine::new(sheets, feed, &cfg.results_sheet, cfg.terminal_policy)
            .with_event_log(EventLogger::new(&cfg.log_dir)),
    );

    let scheduler = SyncScheduler::new(cfg.tz, cfg.insert_window, cfg.update_window);
    let sync_task = tokio::spawn(scheduler.run_forever(engine, cfg.poll_interval));

    let bot = TelegramBot::new(token, service, cfg.http_timeout)?;
    let chat_task = tokio::spawn(bot.run_forever());

    info!("🚀 READY");
    tokio::select! {
        r = sync_task => warn!("Sync scheduler stopped: {r:?}"),
        r = chat_task => warn!("Telegram loop stopped: {r:?}"),
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C, shutting down"),
    }
    Ok(())
}
