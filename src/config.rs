/// Pickem — Config
///
/// Vše z env proměnných (`.env` přes dotenv). Bez credentials má každá
/// hodnota default; chybný formát = start selže s kontextem.

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use feed_client::DEFAULT_FEED_URL;
use game_sync::{HourWindow, TerminalPolicy};
use pick_ledger::SheetNames;
use sheet_gateway::GoogleSheets;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_id:  String,
    pub access_token:    String,
    pub sheets_api_url:  Option<String>,
    pub sheets:          SheetNames,
    pub results_sheet:   String,
    pub tz:              Tz,
    pub insert_window:   HourWindow,
    pub update_window:   HourWindow,
    pub poll_interval:   Duration,
    pub feed_url:        String,
    pub terminal_policy: TerminalPolicy,
    pub http_timeout:    Duration,
    pub telegram_token:  Option<String>,
    pub log_dir:         PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `lookup` returns the raw value for a variable name; empty counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} is not set"));

        let tz_name = or("PICKEM_TZ", "America/Edmonton");
        let tz: Tz = tz_name
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("PICKEM_TZ '{tz_name}' is not an IANA timezone"))?;

        let insert_window = or("INSERT_WINDOW", "8-10")
            .parse::<HourWindow>()
            .context("INSERT_WINDOW")?;
        let update_window = or("UPDATE_WINDOW", "22-1")
            .parse::<HourWindow>()
            .context("UPDATE_WINDOW")?;

        let terminal_policy = or("TERMINAL_POLICY", "status")
            .parse::<TerminalPolicy>()
            .map_err(|e| anyhow!(e))
            .context("TERMINAL_POLICY")?;

        Ok(Self {
            spreadsheet_id: required("SPREADSHEET_ID")?,
            access_token:   required("GOOGLE_ACCESS_TOKEN")?,
            sheets_api_url: get("SHEETS_API_URL"),
            sheets: SheetNames {
                picks: or("PICKS_SHEET", "Picks"),
                users: or("USERS_SHEET", "Users"),
                meta:  or("META_SHEET", "Meta"),
            },
            results_sheet:  or("RESULTS_SHEET", "Results"),
            tz,
            insert_window,
            update_window,
            poll_interval:  Duration::from_secs(secs(&get, "SYNC_POLL_INTERVAL_SECS", 300)?),
            feed_url:       or("FEED_URL_TEMPLATE", DEFAULT_FEED_URL),
            terminal_policy,
            http_timeout:   Duration::from_secs(secs(&get, "HTTP_TIMEOUT_SECS", 15)?),
            telegram_token: get("TELEGRAM_BOT_TOKEN"),
            log_dir:        PathBuf::from(or("PICKEM_LOG_DIR", "logs")),
        })
    }

    /// Sheets client for the configured spreadsheet; `SHEETS_API_URL` swaps the API root.
    pub fn sheets_client(&self) -> Result<GoogleSheets> {
        let client = GoogleSheets::new(&self.spreadsheet_id, &self.access_token, self.http_timeout)
            .context("sheets client")?;
        match &self.sheets_api_url {
            Some(url) => client.with_base_url(url).context("SHEETS_API_URL"),
            None => Ok(client),
        }
    }
}

fn secs<G>(get: &G, key: &str, default: u64) -> Result<u64>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(v) => {
            let n: u64 = v.parse().with_context(|| format!("{key}='{v}' is not a number of seconds"))?;
            if n == 0 {
                return Err(anyhow!("{key} must be positive"));
            }
            Ok(n)
        }
    }
}
