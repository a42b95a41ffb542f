use chrono::NaiveDate;
use feed_client::RawGame;
use sheet_gateway::cell;
use std::fmt;
use std::str::FromStr;

/// Row status. `Scheduled` → one of the terminal states, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Scheduled,
    Final,
    OT,
    SO,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "Scheduled",
            GameStatus::Final     => "Final",
            GameStatus::OT        => "OT",
            GameStatus::SO        => "SO",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Scheduled)
    }

    /// Shootout beats overtime beats regulation.
    pub fn from_flags(overtime: bool, shootout: bool) -> Self {
        if shootout {
            GameStatus::SO
        } else if overtime {
            GameStatus::OT
        } else {
            GameStatus::Final
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Scheduled" => Ok(GameStatus::Scheduled),
            "Final"     => Ok(GameStatus::Final),
            "OT"        => Ok(GameStatus::OT),
            "SO"        => Ok(GameStatus::SO),
            other       => Err(format!("unknown game status '{other}'")),
        }
    }
}

/// One Results row. Identity key: `(date, home, away)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub date:       NaiveDate,
    pub home:       String,
    pub away:       String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub status:     GameStatus,
}

impl GameRecord {
    pub fn scheduled(date: NaiveDate, home: &str, away: &str) -> Self {
        Self {
            date,
            home:       home.to_string(),
            away:       away.to_string(),
            home_score: None,
            away_score: None,
            status:     GameStatus::Scheduled,
        }
    }

    pub fn key(&self) -> (String, String, String) {
        (date_cell(self.date), self.home.clone(), self.away.clone())
    }

    /// `date | home | away | home_score | away_score | status`
    pub fn to_row(&self) -> Vec<String> {
        vec![
            date_cell(self.date),
            self.home.clone(),
            self.away.clone(),
            score_cell(self.home_score),
            score_cell(self.away_score),
            self.status.as_str().to_string(),
        ]
    }

    /// `None` for blank or foreign rows (bad date, unknown status).
    pub fn from_row(row: &[String]) -> Option<Self> {
        let date = NaiveDate::parse_from_str(cell(row, 0).trim(), "%Y-%m-%d").ok()?;
        let status = match cell(row, 5).trim() {
            "" => GameStatus::Scheduled,
            s  => s.parse().ok()?,
        };
        Some(Self {
            date,
            home:       cell(row, 1).trim().to_string(),
            away:       cell(row, 2).trim().to_string(),
            home_score: cell(row, 3).trim().parse().ok(),
            away_score: cell(row, 4).trim().parse().ok(),
            status,
        })
    }
}

fn date_cell(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn score_cell(score: Option<u32>) -> String {
    score.map(|s| s.to_string()).unwrap_or_default()
}

/// When does a fetched game count as finished?
///
/// The feed has been seen reporting `0–0` for games not yet started, so goal
/// counts alone are ambiguous. `StatusString` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalPolicy {
    /// `game_status` starts with "Final" (case-insensitive). Scores required.
    #[default]
    StatusString,
    /// Both goal counts reported, whatever the status says.
    GoalsReported,
}

impl FromStr for TerminalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" | "status_string" => Ok(TerminalPolicy::StatusString),
            "goals"  | "goals_reported" => Ok(TerminalPolicy::GoalsReported),
            other => Err(format!("unknown terminal policy '{other}' (expected status|goals)")),
        }
    }
}

impl TerminalPolicy {
    /// `(home goals, away goals, status)` when `game` is finished under this policy.
    pub fn terminal_result(&self, game: &RawGame) -> Option<(u32, u32, GameStatus)> {
        let (home, away) = (game.home_goals?, game.away_goals?);
        match self {
            TerminalPolicy::StatusString if !is_final_status(&game.status) => None,
            _ => Some((home, away, status_of(game))),
        }
    }
}

fn is_final_status(status: &str) -> bool {
    status
        .trim()
        .get(..5)
        .map_or(false, |head| head.eq_ignore_ascii_case("final"))
}

/// Flags first; "Final OT" / "Final SO" text covers feeds that omit them.
fn status_of(game: &RawGame) -> GameStatus {
    let upper = game.status.to_ascii_uppercase();
    let words: Vec<&str> = upper.split(|c: char| !c.is_ascii_alphanumeric()).collect();
    let shootout = game.shootout || words.contains(&"SO");
    let overtime = game.overtime || words.iter().any(|w| is_ot_word(w));
    GameStatus::from_flags(overtime, shootout)
}

/// `OT`, `2OT`, `3OT`
fn is_ot_word(w: &str) -> bool {
    match w.strip_suffix("OT") {
        Some(prefix) => prefix.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
