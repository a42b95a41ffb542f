use crate::engine::{GameSyncEngine, Phase, PhaseReport, SyncError};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WindowError {
    #[error("hour {0} out of range 0-23")]
    HourOutOfRange(u32),

    #[error("bad window '{0}', expected START-END like 22-1")]
    Syntax(String),
}

/// Half-open hour range `[start, end)` in local time. `start > end` wraps
/// midnight; `start == end` is never open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    start: u32,
    end:   u32,
}

impl HourWindow {
    pub fn new(start: u32, end: u32) -> Result<Self, WindowError> {
        for h in [start, end] {
            if h > 23 {
                return Err(WindowError::HourOutOfRange(h));
            }
        }
        Ok(Self { start, end })
    }

    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start < self.end {
            hour >= self.start && hour < self.end
        } else if self.wraps() {
            hour >= self.start || hour < self.end
        } else {
            false
        }
    }

    /// Date the window opened on, if `local` is inside it. The after-midnight
    /// part of a wrapped window belongs to the previous day.
    pub fn window_date(&self, local: NaiveDateTime) -> Option<NaiveDate> {
        let hour = local.hour();
        if !self.contains(hour) {
            return None;
        }
        let date = local.date();
        if self.wraps() && hour < self.end {
            Some(date - ChronoDuration::days(1))
        } else {
            Some(date)
        }
    }
}

impl FromStr for HourWindow {
    type Err = WindowError;

    /// `"8-10"`, `"22-1"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s.split_once('-').ok_or_else(|| WindowError::Syntax(s.to_string()))?;
        let start = a.trim().parse().map_err(|_| WindowError::Syntax(s.to_string()))?;
        let end = b.trim().parse().map_err(|_| WindowError::Syntax(s.to_string()))?;
        HourWindow::new(start, end)
    }
}

/// Per-phase gate state at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Outside the window.
    Idle,
    /// Inside the window, not yet run for this window date.
    Eligible(NaiveDate),
    /// Inside the window, already ran for this window date.
    RanToday(NaiveDate),
}

/// Today's calendar date in `tz`.
pub fn local_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Once-per-day gate for the two sync phases, polled on a fixed interval.
pub struct SyncScheduler {
    tz:              Tz,
    insert_window:   HourWindow,
    update_window:   HourWindow,
    last_insert_run: Option<NaiveDate>,
    last_update_run: Option<NaiveDate>,
}

impl SyncScheduler {
    pub fn new(tz: Tz, insert_window: HourWindow, update_window: HourWindow) -> Self {
        Self {
            tz,
            insert_window,
            update_window,
            last_insert_run: None,
            last_update_run: None,
        }
    }

    pub fn last_run(&self, phase: Phase) -> Option<NaiveDate> {
        match phase {
            Phase::Insert => self.last_insert_run,
            Phase::Update => self.last_update_run,
        }
    }

    pub fn mark_ran(&mut self, phase: Phase, date: NaiveDate) {
        match phase {
            Phase::Insert => self.last_insert_run = Some(date),
            Phase::Update => self.last_update_run = Some(date),
        }
    }

    fn window(&self, phase: Phase) -> HourWindow {
        match phase {
            Phase::Insert => self.insert_window,
            Phase::Update => self.update_window,
        }
    }

    pub fn gate(&self, phase: Phase, now: DateTime<Utc>) -> GateState {
        let local = now.with_timezone(&self.tz).naive_local();
        match self.window(phase).window_date(local) {
            None => GateState::Idle,
            Some(date) if self.last_run(phase) == Some(date) => GateState::RanToday(date),
            Some(date) => GateState::Eligible(date),
        }
    }

    /// Runs every eligible phase (insert before update). A phase is marked
    /// as ran only on success, so failures are retried on the next tick.
    pub async fn tick(
        &mut self,
        engine: &GameSyncEngine,
        now:    DateTime<Utc>,
    ) -> Vec<(Phase, Result<PhaseReport, SyncError>)> {
        let mut ran = Vec::new();
        for phase in [Phase::Insert, Phase::Update] {
            match self.gate(phase, now) {
                GateState::Eligible(date) => {
                    info!("Running {phase} sync for {date}");
                    let result = engine.run_phase(phase, date).await;
                    if result.is_ok() {
                        self.mark_ran(phase, date);
                    }
                    ran.push((phase, result));
                }
                state => debug!("{phase} gate: {state:?}"),
            }
        }
        ran
    }

    pub async fn run_forever(mut self, engine: Arc<GameSyncEngine>, interval: Duration) {
        info!(
            "Sync scheduler started: tz={} insert={:?} update={:?} every {}s",
            self.tz, self.insert_window, self.update_window, interval.as_secs()
        );
        loop {
            self.tick(&engine, Utc::now()).await;
            sleep(interval).await;
        }
    }
}
