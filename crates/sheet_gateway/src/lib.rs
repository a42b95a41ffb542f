/// Pickem — Sheet Gateway
///
/// Tenká vrstva nad tabulkovým úložištěm: read / write / append / batch-write
/// obdélníkových rozsahů adresovaných jménem listu + A1 rozsahem.
///
/// - `GoogleSheets`: Sheets v4 REST (bearer token)
/// - `MemorySheet`: in-memory grid pro testy a dry-run

pub mod a1;
mod error;
mod google;
mod memory;

pub use error::GatewayError;
pub use google::GoogleSheets;
pub use memory::{GatewayCall, MemorySheet};

use async_trait::async_trait;

/// Rows of cells, row-major. Trailing empty cells and rows may be omitted.
pub type Grid = Vec<Vec<String>>;

#[async_trait]
pub trait SheetGateway: Send + Sync {
    async fn get_range(&self, sheet: &str, range: &str) -> Result<Grid, GatewayError>;

    async fn update_range(&self, sheet: &str, range: &str, values: Grid) -> Result<(), GatewayError>;

    /// Appends below the last occupied row of the table found in `range`.
    async fn append_rows(&self, sheet: &str, range: &str, values: Grid) -> Result<(), GatewayError>;

    /// All `(range, values)` pairs land in one request.
    async fn batch_update(&self, sheet: &str, updates: Vec<(String, Grid)>) -> Result<(), GatewayError>;
}

/// Cell at `col` of `row`, empty string when the row is short.
pub fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}
