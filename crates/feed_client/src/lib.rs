/// Pickem — Feed Client
///
/// Denní rozpis / výsledky z externího feedu (HockeyTech statview schedule).
/// Best-effort: prázdná nebo rozbitá odpověď = žádné zápasy, ne chyba.
/// Chybu vrací jen transport (síť, timeout).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_FEED_URL: &str =
    "https://lscluster.hockeytech.com/feed/?feed=statviewfeed&view=schedule&date={date}&league_id=1&key=public";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed request timed out: {0}")]
    Timeout(String),
}

/// One schedule entry as the feed reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawGame {
    pub home:       String,
    pub away:       String,
    pub home_goals: Option<u32>,   // None = not started / not reported
    pub away_goals: Option<u32>,
    pub status:     String,        // "Final", "Final OT", "7:00 pm MST", ...
    pub overtime:   bool,
    pub shootout:   bool,
}

#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_games(&self, date: NaiveDate) -> Result<Vec<RawGame>, FeedError>;
}

// ── HockeyTech ───────────────────────────────────────────────────────────────

pub struct HockeyTechFeed {
    client:       reqwest::Client,
    url_template: String,
}

impl HockeyTechFeed {
    /// `url_template` must contain `{date}` (replaced by `YYYY-MM-DD`).
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()?,
            url_template: url_template.into(),
        })
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        self.url_template.replace("{date}", &date.format("%Y-%m-%d").to_string())
    }
}

#[async_trait]
impl FeedClient for HockeyTechFeed {
    async fn fetch_games(&self, date: NaiveDate) -> Result<Vec<RawGame>, FeedError> {
        let url = self.url_for(date);
        let resp = self.client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| map_transport(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Feed {date} status {status}, treating as no games");
            return Ok(vec![]);
        }

        let raw = match resp.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(FeedError::Timeout(format!("{url}: {e}"))),
            Err(e) => {
                warn!("Feed {date} body read failed: {e}");
                return Ok(vec![]);
            }
        };
        debug!("Feed {date} raw (first 300): {}", raw.chars().take(300).collect::<String>());

        let games = parse_schedule(&raw);
        info!("Feed {date}: {} games", games.len());
        Ok(games)
    }
}

fn map_transport(url: &str, e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout(format!("{url}: {e}"))
    } else {
        FeedError::Http(e)
    }
}

/// `{ "schedule": [ {...}, ... ] }`, optionally JSONP-wrapped in `( … )`.
/// Entries without both team names are dropped.
pub fn parse_schedule(raw: &str) -> Vec<RawGame> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);

    let data: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Feed JSON parse failed: {e}");
            return vec![];
        }
    };

    let Some(entries) = data["schedule"].as_array() else {
        debug!("Feed: no schedule array in response");
        return vec![];
    };

    entries.iter().filter_map(parse_game).collect()
}

fn parse_game(g: &Value) -> Option<RawGame> {
    let home = text(&g["home_team_name"])?;
    let away = text(&g["visiting_team_name"])?;
    Some(RawGame {
        home,
        away,
        home_goals: goals(&g["home_goal_count"]),
        away_goals: goals(&g["visiting_goal_count"]),
        status:     text(&g["game_status"]).unwrap_or_default(),
        overtime:   flag(&g["overtime"]),
        shootout:   flag(&g["shootout"]),
    })
}

fn text(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn goals(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(v: &Value) -> bool {
    match v {
        Value::Bool(b)   => *b,
        Value::Number(n) => n.as_u64() == Some(1),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True"),
        _ => false,
    }
}

// ── Static feed ──────────────────────────────────────────────────────────────

/// Fixed response for every date; counts calls. Used as an injected fake.
#[derive(Default)]
pub struct StaticFeed {
    games:   Mutex<Vec<RawGame>>,
    calls:   AtomicUsize,
    failing: AtomicBool,
}

impl StaticFeed {
    pub fn new(games: Vec<RawGame>) -> Self {
        Self { games: Mutex::new(games), ..Default::default() }
    }

    pub fn set_games(&self, games: Vec<RawGame>) {
        *self.games.lock().unwrap_or_else(PoisonError::into_inner) = games;
    }

    /// While set, every fetch fails with a timeout.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedClient for StaticFeed {
    async fn fetch_games(&self, date: NaiveDate) -> Result<Vec<RawGame>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout(format!("static feed {date}")));
        }
        Ok(self.games.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
