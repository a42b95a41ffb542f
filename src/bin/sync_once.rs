/// Pickem — jednorázová synchronizace
///
/// Spuštění:
///   cargo run --bin sync-once -- insert
///   cargo run --bin sync-once -- update 2025-01-09

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use chrono::NaiveDate;
use feed_client::HockeyTechFeed;
use game_sync::{local_today, GameSyncEngine, Phase};
use logger::EventLogger;
use pickem_live::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn parse_args(args: &[String]) -> Result<(Phase, Option<NaiveDate>)> {
    let phase = match args.first().map(String::as_str) {
        Some("insert") => Phase::Insert,
        Some("update") => Phase::Update,
        _ => bail!("usage: sync-once <insert|update> [YYYY-MM-DD]"),
    };
    let date = args
        .get(1)
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").with_context(|| format!("bad date '{d}'")))
        .transpose()?;
    Ok((phase, date))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (phase, date) = parse_args(&args)?;

    let cfg = Config::from_env()?;
    let date = date.unwrap_or_else(|| local_today(cfg.tz));

    let sheets = Arc::new(cfg.sheets_client()?);
    let feed = Arc::new(HockeyTechFeed::new(&cfg.feed_url, cfg.http_timeout).context("feed client")?);
    let engine = GameSyncEngine::new(sheets, feed, &cfg.results_sheet, cfg.terminal_policy)
        .with_event_log(EventLogger::new(&cfg.log_dir));

    let report = engine
        .run_phase(phase, date)
        .await
        .with_context(|| format!("{phase} sync for {date}"))?;
    info!("{phase} {date}: fetched {}, wrote {}", report.fetched, report.written);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn phase_and_optional_date() {
        let (p, d) = parse_args(&args(&["insert"])).unwrap();
        assert_eq!(p, Phase::Insert);
        assert!(d.is_none());

        let (p, d) = parse_args(&args(&["update", "2025-01-09"])).unwrap();
        assert_eq!(p, Phase::Update);
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 1, 9));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["both"])).is_err());
        assert!(parse_args(&args(&["update", "09/01/2025"])).is_err());
    }
}
