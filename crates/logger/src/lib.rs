/// Pickem — Logger
/// JSONL audit stream: one file per UTC day, one event per line.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.log_dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let path  = self.file_for(Utc::now().date_naive());
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Audit zápis nesmí shodit operaci, která ho vyvolala.
    pub fn log_quiet<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.log(event) {
            tracing::warn!("Audit log write failed: {e}");
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct PicksSubmittedEvent {
    pub ts:           String,
    pub event:        &'static str,   // "PICKS_SUBMITTED"
    pub submitter_id: String,
    pub column:       String,
    pub first_row:    u32,
    pub rows_written: usize,
}

impl PicksSubmittedEvent {
    pub fn new(submitter_id: &str, column: &str, first_row: u32, rows_written: usize) -> Self {
        Self {
            ts:           now_iso(),
            event:        "PICKS_SUBMITTED",
            submitter_id: submitter_id.to_string(),
            column:       column.to_string(),
            first_row,
            rows_written,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PicksRejectedEvent {
    pub ts:           String,
    pub event:        &'static str,   // "PICKS_REJECTED"
    pub submitter_id: String,
    pub reason:       String,
}

impl PicksRejectedEvent {
    pub fn new(submitter_id: &str, reason: impl Into<String>) -> Self {
        Self {
            ts:           now_iso(),
            event:        "PICKS_REJECTED",
            submitter_id: submitter_id.to_string(),
            reason:       reason.into(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SyncPhaseEvent {
    pub ts:      String,
    pub event:   &'static str,        // "SYNC_PHASE"
    pub phase:   String,              // "insert" | "update"
    pub date:    String,              // YYYY-MM-DD
    pub fetched: usize,
    pub written: usize,
    pub ok:      bool,
    pub message: String,
}

impl SyncPhaseEvent {
    pub fn new(phase: &str, date: NaiveDate, fetched: usize, written: usize, ok: bool, message: impl Into<String>) -> Self {
        Self {
            ts:      now_iso(),
            event:   "SYNC_PHASE",
            phase:   phase.to_string(),
            date:    date.format("%Y-%m-%d").to_string(),
            fetched,
            written,
            ok,
            message: message.into(),
        }
    }
}
