use crate::record::{GameRecord, TerminalPolicy};
use chrono::NaiveDate;
use feed_client::{FeedClient, FeedError, RawGame};
use logger::{EventLogger, SyncPhaseEvent};
use sheet_gateway::{cell, GatewayError, Grid, SheetGateway};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Data rows start under the header; read result row `i` is sheet row `i + 2`.
pub const RESULTS_READ_RANGE: &str = "A2:F";
pub const RESULTS_APPEND_RANGE: &str = "A:F";
const FIRST_DATA_ROW: u32 = 2;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("results sheet: {0}")]
    Gateway(#[from] GatewayError),

    #[error("feed: {0}")]
    Feed(#[from] FeedError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Morning: append missing games as `Scheduled`.
    Insert,
    /// Night: write scores + terminal status.
    Update,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Insert => "insert",
            Phase::Update => "update",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseReport {
    pub fetched: usize,
    pub written: usize,
}

pub struct GameSyncEngine {
    gateway: Arc<dyn SheetGateway>,
    feed:    Arc<dyn FeedClient>,
    sheet:   String,
    policy:  TerminalPolicy,
    events:  Option<EventLogger>,
}

impl GameSyncEngine {
    pub fn new(
        gateway: Arc<dyn SheetGateway>,
        feed:    Arc<dyn FeedClient>,
        sheet:   impl Into<String>,
        policy:  TerminalPolicy,
    ) -> Self {
        Self { gateway, feed, sheet: sheet.into(), policy, events: None }
    }

    pub fn with_event_log(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs one phase for `date` and records the outcome in the audit log.
    pub async fn run_phase(&self, phase: Phase, date: NaiveDate) -> Result<PhaseReport, SyncError> {
        let result = match phase {
            Phase::Insert => self.insert_phase(date).await,
            Phase::Update => self.update_phase(date).await,
        };

        match &result {
            Ok(r) => info!(%phase, %date, fetched = r.fetched, written = r.written, "Sync phase done"),
            Err(e) => warn!(%phase, %date, "Sync phase aborted: {e}"),
        }
        if let Some(ev) = &self.events {
            let event = match &result {
                Ok(r)  => SyncPhaseEvent::new(phase.as_str(), date, r.fetched, r.written, true, "ok"),
                Err(e) => SyncPhaseEvent::new(phase.as_str(), date, 0, 0, false, e.to_string()),
            };
            ev.log_quiet(&event);
        }
        result
    }

    /// Appends one `Scheduled` row per fetched game whose `(date, home, away)`
    /// is not already in the sheet. Duplicate games in the feed collapse.
    pub async fn insert_phase(&self, date: NaiveDate) -> Result<PhaseReport, SyncError> {
        let games = self.feed.fetch_games(date).await?;
        if games.is_empty() {
            info!("No games for {date}");
            return Ok(PhaseReport::default());
        }

        let rows = self.gateway.get_range(&self.sheet, RESULTS_READ_RANGE).await?;
        let mut known: HashSet<(String, String, String)> = rows.iter().map(|r| row_key(r)).collect();

        let inserts: Grid = games
            .iter()
            .map(|g| GameRecord::scheduled(date, &g.home, &g.away))
            .filter(|rec| known.insert(rec.key()))
            .map(|rec| rec.to_row())
            .collect();

        if inserts.is_empty() {
            info!("All {} games for {date} already present", games.len());
            return Ok(PhaseReport { fetched: games.len(), written: 0 });
        }

        let written = inserts.len();
        self.gateway.append_rows(&self.sheet, RESULTS_APPEND_RANGE, inserts).await?;
        info!("Inserted {written} games for {date}");
        Ok(PhaseReport { fetched: games.len(), written })
    }

    /// Writes score + status into rows dated `date` whose game the feed reports
    /// as finished. Rows are addressed by their position in the read result,
    /// so the read rows are never filtered or reordered before indexing.
    /// Rows that do not parse as a game (blank, unknown status) are left alone.
    pub async fn update_phase(&self, date: NaiveDate) -> Result<PhaseReport, SyncError> {
        let games = self.feed.fetch_games(date).await?;
        if games.is_empty() {
            info!("No games for {date}, nothing to update");
            return Ok(PhaseReport::default());
        }

        let rows = self.gateway.get_range(&self.sheet, RESULTS_READ_RANGE).await?;

        let mut updates: Vec<(String, Grid)> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let Some(rec) = GameRecord::from_row(row) else {
                continue;
            };
            if rec.date != date {
                continue;
            }
            let Some(game) = find_game(&games, &rec.home, &rec.away) else {
                continue;
            };
            let Some((home_goals, away_goals, status)) = self.policy.terminal_result(game) else {
                continue;
            };

            let landed = rec.home_score == Some(home_goals)
                && rec.away_score == Some(away_goals)
                && rec.status == status;
            if landed {
                continue;
            }
            if rec.status.is_terminal() && rec.status != status {
                warn!("{} @ {} {date}: feed changed result {} → {status}", rec.away, rec.home, rec.status);
            }

            let sheet_row = i as u32 + FIRST_DATA_ROW;
            let values = vec![home_goals.to_string(), away_goals.to_string(), status.as_str().to_string()];
            updates.push((format!("D{sheet_row}:F{sheet_row}"), vec![values]));
            info!("Updated {} @ {}: {home_goals}-{away_goals} {status}", rec.away, rec.home);
        }

        if updates.is_empty() {
            return Ok(PhaseReport { fetched: games.len(), written: 0 });
        }

        let written = updates.len();
        self.gateway.batch_update(&self.sheet, updates).await?;
        Ok(PhaseReport { fetched: games.len(), written })
    }
}

fn row_key(row: &[String]) -> (String, String, String) {
    (
        cell(row, 0).trim().to_string(),
        cell(row, 1).trim().to_string(),
        cell(row, 2).trim().to_string(),
    )
}

fn find_game<'a>(games: &'a [RawGame], home: &str, away: &str) -> Option<&'a RawGame> {
    games.iter().find(|g| g.home == home && g.away == away)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_client::StaticFeed;
    use sheet_gateway::{GatewayCall, MemorySheet};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 9).unwrap()
    }

    fn scheduled(home: &str, away: &str) -> RawGame {
        RawGame {
            home:   home.into(),
            away:   away.into(),
            status: "7:00 pm MST".into(),
            ..Default::default()
        }
    }

    fn finished(home: &str, away: &str, h: u32, a: u32) -> RawGame {
        RawGame {
            home:       home.into(),
            away:       away.into(),
            home_goals: Some(h),
            away_goals: Some(a),
            status:     "Final".into(),
            ..Default::default()
        }
    }

    fn results_sheet() -> Arc<MemorySheet> {
        Arc::new(MemorySheet::new().with_rows(
            "Results",
            1,
            vec![vec!["date", "home", "away", "home_score", "away_score", "status"]],
        ))
    }

    fn engine(sheet: &Arc<MemorySheet>, feed: &Arc<StaticFeed>) -> GameSyncEngine {
        GameSyncEngine::new(sheet.clone(), feed.clone(), "Results", TerminalPolicy::StatusString)
    }

    #[tokio::test]
    async fn insert_appends_scheduled_rows() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Regina", "Brandon"), scheduled("Calgary", "Red Deer")]));

        let report = engine(&sheet, &feed).insert_phase(day()).await.unwrap();
        assert_eq!(report, PhaseReport { fetched: 2, written: 2 });

        let rows = sheet.get_range("Results", RESULTS_READ_RANGE).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["2025-01-09", "Regina", "Brandon", "", "", "Scheduled"]);
        assert_eq!(rows[1][1], "Calgary");
    }

    #[tokio::test]
    async fn insert_twice_writes_nothing_second_time() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Regina", "Brandon")]));
        let engine = engine(&sheet, &feed);

        engine.insert_phase(day()).await.unwrap();
        sheet.clear_calls();
        let report = engine.insert_phase(day()).await.unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(sheet.write_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_feed_entries_insert_once() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![
            scheduled("Regina", "Brandon"),
            scheduled("Regina", "Brandon"),
        ]));

        let report = engine(&sheet, &feed).insert_phase(day()).await.unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(sheet.get_range("Results", RESULTS_READ_RANGE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_teams_other_day_is_a_different_game() {
        let sheet = Arc::new(MemorySheet::new().with_rows(
            "Results",
            1,
            vec![vec!["date"], vec!["2025-01-08", "Regina", "Brandon", "2", "1", "Final"]],
        ));
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Regina", "Brandon")]));

        let report = engine(&sheet, &feed).insert_phase(day()).await.unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(sheet.cell("Results", "A", 3).as_deref(), Some("2025-01-09"));
    }

    #[tokio::test]
    async fn empty_feed_touches_nothing() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![]));
        let engine = engine(&sheet, &feed);

        assert_eq!(engine.insert_phase(day()).await.unwrap(), PhaseReport::default());
        assert_eq!(engine.update_phase(day()).await.unwrap(), PhaseReport::default());
        assert!(sheet.calls().is_empty());
    }

    #[tokio::test]
    async fn update_writes_positional_rows() {
        let sheet = Arc::new(MemorySheet::new().with_rows(
            "Results",
            1,
            vec![
                vec!["date", "home", "away"],
                vec!["2025-01-08", "Regina", "Brandon", "2", "1", "Final"],
                vec![],
                vec!["2025-01-09", "Calgary", "Red Deer", "", "", "Scheduled"],
                vec!["2025-01-09", "Regina", "Brandon", "", "", "Scheduled"],
            ],
        ));
        let mut ot = finished("Regina", "Brandon", 4, 3);
        ot.overtime = true;
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Calgary", "Red Deer"), ot]));

        let report = engine(&sheet, &feed).update_phase(day()).await.unwrap();
        assert_eq!(report.written, 1);

        // read row index 3 → sheet row 5
        assert_eq!(sheet.cell("Results", "D", 5).as_deref(), Some("4"));
        assert_eq!(sheet.cell("Results", "E", 5).as_deref(), Some("3"));
        assert_eq!(sheet.cell("Results", "F", 5).as_deref(), Some("OT"));
        assert_eq!(sheet.cell("Results", "F", 4).as_deref(), Some("Scheduled"));
        assert_eq!(sheet.cell("Results", "D", 2).as_deref(), Some("2"));
        assert!(sheet.calls().contains(&GatewayCall::BatchUpdate {
            sheet:  "Results".to_string(),
            ranges: vec!["D5:F5".to_string()],
        }));
    }

    #[tokio::test]
    async fn update_rerun_leaves_bytes_unchanged() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Regina", "Brandon"), scheduled("Calgary", "Red Deer")]));
        let engine = engine(&sheet, &feed);
        engine.insert_phase(day()).await.unwrap();

        let mut so = finished("Calgary", "Red Deer", 2, 1);
        so.shootout = true;
        feed.set_games(vec![finished("Regina", "Brandon", 5, 2), so]);

        assert_eq!(engine.update_phase(day()).await.unwrap().written, 2);
        let first = sheet.snapshot("Results");
        assert_eq!(sheet.cell("Results", "F", 3).as_deref(), Some("SO"));

        sheet.clear_calls();
        assert_eq!(engine.update_phase(day()).await.unwrap().written, 0);
        assert_eq!(sheet.snapshot("Results"), first);
        assert_eq!(sheet.write_count(), 0);
    }

    #[tokio::test]
    async fn update_reads_status_cells_as_records() {
        let sheet = Arc::new(MemorySheet::new().with_rows(
            "Results",
            1,
            vec![
                vec!["date", "home", "away"],
                vec!["2025-01-09", "Regina", "Brandon", "3", "2", "Final"],
                vec!["2025-01-09", "Calgary", "Red Deer", "", "", "Postponed"],
            ],
        ));
        let mut ot = finished("Regina", "Brandon", 3, 2);
        ot.overtime = true;
        let feed = Arc::new(StaticFeed::new(vec![ot, finished("Calgary", "Red Deer", 1, 0)]));

        let report = engine(&sheet, &feed).update_phase(day()).await.unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(sheet.cell("Results", "F", 2).as_deref(), Some("OT"));
        assert_eq!(sheet.cell("Results", "F", 3).as_deref(), Some("Postponed"));
        assert_eq!(sheet.cell("Results", "D", 3), None);
    }

    #[tokio::test]
    async fn insert_after_update_does_not_duplicate_finished_games() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Regina", "Brandon")]));
        let engine = engine(&sheet, &feed);
        engine.insert_phase(day()).await.unwrap();

        feed.set_games(vec![finished("Regina", "Brandon", 1, 0)]);
        engine.update_phase(day()).await.unwrap();
        assert_eq!(engine.insert_phase(day()).await.unwrap().written, 0);
        assert_eq!(sheet.get_range("Results", RESULTS_READ_RANGE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gateway_failure_aborts_phase_and_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = results_sheet();
        sheet.set_failing(true);
        let feed = Arc::new(StaticFeed::new(vec![scheduled("Regina", "Brandon")]));
        let engine = engine(&sheet, &feed).with_event_log(EventLogger::new(dir.path()));

        let err = engine.run_phase(Phase::Insert, day()).await.unwrap_err();
        assert!(matches!(err, SyncError::Gateway(_)));

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        let contents = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert!(contents.contains("\"ok\":false"));
        assert!(contents.contains("\"phase\":\"insert\""));
    }

    #[tokio::test]
    async fn feed_failure_is_sync_error() {
        let sheet = results_sheet();
        let feed = Arc::new(StaticFeed::new(vec![]));
        feed.set_failing(true);
        let err = engine(&sheet, &feed).update_phase(day()).await.unwrap_err();
        assert!(matches!(err, SyncError::Feed(_)));
        assert!(sheet.calls().is_empty());
    }
}
