use sheet_gateway::a1::column_span;
use sheet_gateway::{GatewayError, SheetGateway};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("nothing to write")]
    EmptyPicks,

    #[error("{count} picks from row {start_row} run past the last sheet row")]
    RowOverflow { start_row: u32, count: usize },

    #[error("ledger write failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// Writes a round of picks as one contiguous single-column range.
pub struct PickLedgerWriter {
    gateway: Arc<dyn SheetGateway>,
    sheet:   String,
}

impl PickLedgerWriter {
    pub fn new(gateway: Arc<dyn SheetGateway>, sheet: impl Into<String>) -> Self {
        Self { gateway, sheet: sheet.into() }
    }

    /// Rows `start_row ..= start_row + picks.len() - 1` of `column`, one request.
    /// On error the caller cannot tell whether any cell landed.
    pub async fn write(&self, column: &str, start_row: u32, picks: &[String]) -> Result<usize, WriteError> {
        if picks.is_empty() {
            return Err(WriteError::EmptyPicks);
        }
        let last_row = u32::try_from(picks.len() - 1)
            .ok()
            .and_then(|extra| start_row.checked_add(extra))
            .ok_or(WriteError::RowOverflow { start_row, count: picks.len() })?;
        let range = column_span(column, start_row, last_row);
        let values = picks.iter().map(|p| vec![p.clone()]).collect();

        self.gateway.update_range(&self.sheet, &range, values).await?;
        info!("Picks written {}!{} ({} rows)", self.sheet, range, picks.len());
        Ok(picks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_gateway::{GatewayCall, MemorySheet};

    fn picks(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn writes_exact_rows_and_nothing_else() {
        let sheet = Arc::new(
            MemorySheet::new().with_rows("Picks", 4, vec![vec!["", "", "keep"], vec![], vec![], vec![], vec!["", "", "keep too"]]),
        );
        let before = sheet.snapshot("Picks");
        let writer = PickLedgerWriter::new(sheet.clone(), "Picks");

        let n = writer.write("C", 5, &picks(&["X", "Y", "Z"])).await.unwrap();
        assert_eq!(n, 3);

        let after = sheet.snapshot("Picks");
        assert_eq!(sheet.cell("Picks", "C", 5).as_deref(), Some("X"));
        assert_eq!(sheet.cell("Picks", "C", 6).as_deref(), Some("Y"));
        assert_eq!(sheet.cell("Picks", "C", 7).as_deref(), Some("Z"));
        assert_eq!(after.len(), before.len() + 3);
        for (k, v) in &before {
            assert_eq!(after.get(k), Some(v));
        }

        assert_eq!(
            sheet.calls(),
            vec![GatewayCall::Update { sheet: "Picks".to_string(), range: "C5:C7".to_string() }]
        );
    }

    #[tokio::test]
    async fn resubmission_overwrites_same_cells() {
        let sheet = Arc::new(MemorySheet::new());
        let writer = PickLedgerWriter::new(sheet.clone(), "Picks");
        writer.write("D", 10, &picks(&["A", "B"])).await.unwrap();
        writer.write("D", 10, &picks(&["C", "A"])).await.unwrap();
        assert_eq!(sheet.cell("Picks", "D", 10).as_deref(), Some("C"));
        assert_eq!(sheet.cell("Picks", "D", 11).as_deref(), Some("A"));
        assert_eq!(sheet.snapshot("Picks").len(), 2);
    }

    #[tokio::test]
    async fn gateway_failure_carries_cause() {
        let sheet = Arc::new(MemorySheet::new());
        sheet.set_failing(true);
        let writer = PickLedgerWriter::new(sheet.clone(), "Picks");
        let err = writer.write("C", 5, &picks(&["X"])).await.unwrap_err();
        assert!(matches!(err, WriteError::Gateway(GatewayError::Status { code: 503, .. })));
    }

    #[tokio::test]
    async fn rows_past_u32_range_are_refused_before_writing() {
        let sheet = Arc::new(MemorySheet::new());
        let writer = PickLedgerWriter::new(sheet.clone(), "Picks");
        let err = writer.write("C", u32::MAX, &picks(&["A", "B"])).await.unwrap_err();
        assert!(matches!(err, WriteError::RowOverflow { start_row: u32::MAX, count: 2 }));
        assert!(sheet.calls().is_empty());

        writer.write("C", u32::MAX, &picks(&["A"])).await.unwrap();
        assert_eq!(sheet.cell("Picks", "C", u32::MAX).as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn empty_picks_never_reach_the_store() {
        let sheet = Arc::new(MemorySheet::new());
        let writer = PickLedgerWriter::new(sheet.clone(), "Picks");
        assert!(matches!(writer.write("C", 5, &[]).await, Err(WriteError::EmptyPicks)));
        assert!(sheet.calls().is_empty());
    }
}
