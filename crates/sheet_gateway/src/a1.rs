//! A1 notation helpers: column letters, cell references, rectangular ranges.

use crate::GatewayError;

/// `"A"` → 1, `"Z"` → 26, `"AA"` → 27. Case-insensitive, ASCII letters only.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut idx: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        idx = idx * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    Some(idx)
}

/// Normalized column letters, or `None` when `raw` is not a column reference.
pub fn normalize_column(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    column_index(trimmed).map(|_| trimmed.to_ascii_uppercase())
}

/// `Results` → `Results`, `My Picks` → `'My Picks'`.
pub fn quote_sheet(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Sheet-qualified range as the Sheets API expects it.
pub fn qualified(sheet: &str, range: &str) -> String {
    format!("{}!{}", quote_sheet(sheet), range)
}

/// Single-column range `C5:C7`.
pub fn column_span(column: &str, first_row: u32, last_row: u32) -> String {
    format!("{column}{first_row}:{column}{last_row}")
}

/// One end of a range. Either part may be open (`A` or `5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub col: Option<u32>,
    pub row: Option<u32>,
}

impl CellRef {
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let raw = raw.trim();
        let split = raw.find(|c: char| c.is_ascii_digit()).unwrap_or(raw.len());
        let (letters, digits) = raw.split_at(split);

        let col = if letters.is_empty() {
            None
        } else {
            Some(column_index(letters).ok_or_else(|| GatewayError::InvalidRange(raw.to_string()))?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            match digits.parse::<u32>() {
                Ok(r) if r > 0 => Some(r),
                _ => return Err(GatewayError::InvalidRange(raw.to_string())),
            }
        };

        if col.is_none() && row.is_none() {
            return Err(GatewayError::InvalidRange(raw.to_string()));
        }
        Ok(Self { col, row })
    }
}

/// `start[:end]`. A single reference addresses one cell (or one whole column/row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end:   CellRef,
}

impl CellRange {
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        let mut parts = raw.split(':');
        let start = CellRef::parse(parts.next().unwrap_or(""))?;
        let end = match parts.next() {
            Some(e) => CellRef::parse(e)?,
            None => start,
        };
        if parts.next().is_some() {
            return Err(GatewayError::InvalidRange(raw.to_string()));
        }
        Ok(Self { start, end })
    }

    pub fn first_row(&self) -> u32 {
        self.start.row.unwrap_or(1)
    }

    pub fn first_col(&self) -> u32 {
        self.start.col.unwrap_or(1)
    }

    /// `None` = open-ended downwards.
    pub fn last_row(&self) -> Option<u32> {
        self.end.row
    }

    /// `None` = open-ended to the right.
    pub fn last_col(&self) -> Option<u32> {
        self.end.col
    }
}
