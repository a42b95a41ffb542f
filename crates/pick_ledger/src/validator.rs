use crate::{MetaConfig, UserDirectory};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("meta sheet missing start_row or games_today")]
    MissingMeta,

    #[error("expected {expected} picks, got {actual}")]
    CountMismatch { expected: u32, actual: usize },

    #[error("user is not registered")]
    UnregisteredUser,
}

/// Picks ready to be written: `picks[i]` goes to row `start_row + i` of `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPicks {
    pub picks:     Vec<String>,
    pub column:    String,
    pub start_row: u32,
}

/// Split on `,` or newline, trim, drop empties. Order preserved.
pub fn parse_picks(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pure check of one submission. Meta first, then count, then identity.
pub fn validate(
    submitter_id: &str,
    raw_text:     &str,
    meta:         &MetaConfig,
    directory:    &UserDirectory,
) -> Result<ValidatedPicks, RejectionReason> {
    let (start_row, games_today) = meta.complete().ok_or(RejectionReason::MissingMeta)?;

    let picks = parse_picks(raw_text);
    if picks.len() != games_today as usize {
        return Err(RejectionReason::CountMismatch { expected: games_today, actual: picks.len() });
    }

    let column = directory
        .column_for(submitter_id)
        .ok_or(RejectionReason::UnregisteredUser)?
        .to_string();

    Ok(ValidatedPicks { picks, column, start_row })
}
