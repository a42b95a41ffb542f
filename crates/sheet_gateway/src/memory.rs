use crate::a1::{column_index, CellRange};
use crate::{GatewayError, Grid, SheetGateway};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

type Cells = BTreeMap<(u32, u32), String>; // (row, col) → value, both 1-based

/// Record of one gateway request, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Get         { sheet: String, range: String },
    Update      { sheet: String, range: String },
    Append      { sheet: String, range: String, rows: usize },
    BatchUpdate { sheet: String, ranges: Vec<String> },
}

impl GatewayCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, GatewayCall::Get { .. })
    }
}

/// In-memory grid with the same read/append semantics as the Sheets API:
/// reads drop trailing empty cells and rows, appends land below the last
/// occupied row of the addressed columns.
#[derive(Default)]
pub struct MemorySheet {
    sheets:  Mutex<HashMap<String, Cells>>,
    calls:   Mutex<Vec<GatewayCall>>,
    failing: AtomicBool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `rows` starting at column A of `first_row`.
    pub fn with_rows(self, sheet: &str, first_row: u32, rows: Vec<Vec<&str>>) -> Self {
        {
            let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
            let cells = sheets.entry(sheet.to_string()).or_default();
            let grid: Grid = rows
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect();
            write_grid(cells, first_row, 1, &grid);
        }
        self
    }

    /// `cell("Picks", "C", 5)`
    pub fn cell(&self, sheet: &str, column: &str, row: u32) -> Option<String> {
        let col = column_index(column)?;
        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets.get(sheet).and_then(|c| c.get(&(row, col)).cloned())
    }

    /// Every occupied cell of `sheet` keyed by `(row, col)`.
    pub fn snapshot(&self, sheet: &str) -> BTreeMap<(u32, u32), String> {
        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets.get(sheet).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_write()).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// While set, every request fails with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Status { code: 503, body: "backend unavailable".to_string() });
        }
        Ok(())
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

fn write_grid(cells: &mut Cells, top_row: u32, left_col: u32, values: &Grid) {
    for (i, row) in values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let key = (top_row + i as u32, left_col + j as u32);
            if value.is_empty() {
                cells.remove(&key);
            } else {
                cells.insert(key, value.clone());
            }
        }
    }
}

/// Rejects writes that spill outside a closed range, as the real API does.
fn check_fits(range: &CellRange, raw: &str, values: &Grid) -> Result<(), GatewayError> {
    if let Some(last_row) = range.last_row() {
        let rows = (u64::from(last_row) + 1).saturating_sub(u64::from(range.first_row()));
        if values.len() as u64 > rows {
            return Err(GatewayError::InvalidRange(format!("{raw}: {} rows do not fit", values.len())));
        }
    }
    if let Some(last_col) = range.last_col() {
        let cols = (u64::from(last_col) + 1).saturating_sub(u64::from(range.first_col()));
        if values.iter().any(|r| r.len() as u64 > cols) {
            return Err(GatewayError::InvalidRange(format!("{raw}: row wider than range")));
        }
    }
    Ok(())
}

fn in_cols(col: u32, range: &CellRange) -> bool {
    col >= range.first_col() && range.last_col().map_or(true, |last| col <= last)
}

#[async_trait]
impl SheetGateway for MemorySheet {
    async fn get_range(&self, sheet: &str, range: &str) -> Result<Grid, GatewayError> {
        self.check_available()?;
        let parsed = CellRange::parse(range)?;
        self.record(GatewayCall::Get { sheet: sheet.to_string(), range: range.to_string() });

        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(cells) = sheets.get(sheet) else {
            return Ok(Vec::new());
        };

        let occupied: Vec<(u32, u32)> = cells
            .keys()
            .copied()
            .filter(|&(row, col)| {
                row >= parsed.first_row()
                    && parsed.last_row().map_or(true, |last| row <= last)
                    && in_cols(col, &parsed)
            })
            .collect();
        let Some(last_row) = occupied.iter().map(|&(r, _)| r).max() else {
            return Ok(Vec::new());
        };

        let mut grid = Vec::new();
        for row in parsed.first_row()..=last_row {
            let row_max = occupied.iter().filter(|&&(r, _)| r == row).map(|&(_, c)| c).max();
            let mut out = Vec::new();
            if let Some(max_col) = row_max {
                for col in parsed.first_col()..=max_col {
                    out.push(cells.get(&(row, col)).cloned().unwrap_or_default());
                }
            }
            grid.push(out);
        }
        Ok(grid)
    }

    async fn update_range(&self, sheet: &str, range: &str, values: Grid) -> Result<(), GatewayError> {
        self.check_available()?;
        let parsed = CellRange::parse(range)?;
        check_fits(&parsed, range, &values)?;
        self.record(GatewayCall::Update { sheet: sheet.to_string(), range: range.to_string() });

        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        let cells = sheets.entry(sheet.to_string()).or_default();
        write_grid(cells, parsed.first_row(), parsed.first_col(), &values);
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, range: &str, values: Grid) -> Result<(), GatewayError> {
        self.check_available()?;
        let parsed = CellRange::parse(range)?;
        self.record(GatewayCall::Append {
            sheet: sheet.to_string(),
            range: range.to_string(),
            rows:  values.len(),
        });

        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        let cells = sheets.entry(sheet.to_string()).or_default();
        let next_row = cells
            .keys()
            .filter(|&&(row, col)| row >= parsed.first_row() && in_cols(col, &parsed))
            .map(|&(row, _)| row + 1)
            .max()
            .unwrap_or(parsed.first_row());
        write_grid(cells, next_row, parsed.first_col(), &values);
        Ok(())
    }

    async fn batch_update(&self, sheet: &str, updates: Vec<(String, Grid)>) -> Result<(), GatewayError> {
        self.check_available()?;
        let mut parsed = Vec::with_capacity(updates.len());
        for (range, values) in &updates {
            let r = CellRange::parse(range)?;
            check_fits(&r, range, values)?;
            parsed.push(r);
        }
        self.record(GatewayCall::BatchUpdate {
            sheet:  sheet.to_string(),
            ranges: updates.iter().map(|(r, _)| r.clone()).collect(),
        });

        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        let cells = sheets.entry(sheet.to_string()).or_default();
        for (r, (_, values)) in parsed.iter().zip(updates.iter()) {
            write_grid(cells, r.first_row(), r.first_col(), values);
        }
        Ok(())
    }
}
