use crate::{validate, ColumnLocks, MetaConfig, PickLedgerWriter, RejectionReason, UserDirectory, WriteError};
use logger::{EventLogger, PicksRejectedEvent, PicksSubmittedEvent};
use sheet_gateway::{GatewayError, SheetGateway};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const REPLY_OK: &str = "✅ Picks submitted successfully!";
pub const REPLY_MISSING_META: &str = "❌ Meta sheet missing start_row or games_today.";
pub const REPLY_UNREGISTERED: &str = "❌ You are not registered in the Users sheet.";
pub const REPLY_FAILED: &str = "❌ Error writing picks.";

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("rejected: {0}")]
    Rejected(#[from] RejectionReason),

    #[error("ledger read failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug, Clone)]
pub struct SheetNames {
    pub picks: String,
    pub users: String,
    pub meta:  String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            picks: "Picks".to_string(),
            users: "Users".to_string(),
            meta:  "Meta".to_string(),
        }
    }
}

/// Chat-facing entry point: `(user id, raw text) → reply`.
pub struct PickService {
    gateway: Arc<dyn SheetGateway>,
    writer:  PickLedgerWriter,
    sheets:  SheetNames,
    locks:   ColumnLocks,
    events:  Option<EventLogger>,
}

impl PickService {
    pub fn new(gateway: Arc<dyn SheetGateway>, sheets: SheetNames) -> Self {
        Self {
            writer: PickLedgerWriter::new(gateway.clone(), sheets.picks.clone()),
            gateway,
            sheets,
            locks: ColumnLocks::new(),
            events: None,
        }
    }

    pub fn with_event_log(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    /// Exactly one reply per call.
    pub async fn submit(&self, submitter_id: &str, raw_text: &str) -> String {
        let result = self.try_submit(submitter_id, raw_text).await;
        match &result {
            Ok(rows) => info!(user = %submitter_id, rows, "Picks accepted"),
            Err(SubmitError::Rejected(reason)) => {
                info!(user = %submitter_id, "Picks rejected: {reason}");
                if let Some(ev) = &self.events {
                    ev.log_quiet(&PicksRejectedEvent::new(submitter_id, reason.to_string()));
                }
            }
            Err(e) => warn!(user = %submitter_id, "Pick submission failed: {e}"),
        }
        reply_for(&result)
    }

    /// Meta + directory read fresh on every call; nothing is written unless
    /// validation passes.
    pub async fn try_submit(&self, submitter_id: &str, raw_text: &str) -> Result<usize, SubmitError> {
        let meta_rows = self.gateway.get_range(&self.sheets.meta, "A:B").await?;
        let meta = MetaConfig::from_rows(&meta_rows);

        let user_rows = self.gateway.get_range(&self.sheets.users, "A:B").await?;
        let directory = UserDirectory::from_rows(&user_rows);

        let valid = validate(submitter_id, raw_text, &meta, &directory)?;

        let _column_guard = self.locks.lock(&valid.column).await;
        let rows = self.writer.write(&valid.column, valid.start_row, &valid.picks).await?;

        if let Some(ev) = &self.events {
            ev.log_quiet(&PicksSubmittedEvent::new(submitter_id, &valid.column, valid.start_row, rows));
        }
        Ok(rows)
    }
}

pub fn reply_for(result: &Result<usize, SubmitError>) -> String {
    match result {
        Ok(_) => REPLY_OK.to_string(),
        Err(SubmitError::Rejected(RejectionReason::MissingMeta)) => REPLY_MISSING_META.to_string(),
        Err(SubmitError::Rejected(RejectionReason::CountMismatch { expected, actual })) => {
            format!("❌ You must submit exactly {expected} picks. You submitted {actual}.")
        }
        Err(SubmitError::Rejected(RejectionReason::UnregisteredUser)) => REPLY_UNREGISTERED.to_string(),
        Err(SubmitError::Gateway(_)) | Err(SubmitError::Write(_)) => REPLY_FAILED.to_string(),
    }
}
