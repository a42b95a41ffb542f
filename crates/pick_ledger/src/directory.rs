use sheet_gateway::a1::normalize_column;
use sheet_gateway::{cell, Grid};
use tracing::warn;

/// `externalUserId → column letter`, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    entries: Vec<(String, String)>,
}

impl UserDirectory {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Rows of `user id | column`. Rows whose second cell is not a column
    /// reference are skipped.
    pub fn from_rows(rows: &Grid) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let id = cell(row, 0).trim();
            if id.is_empty() {
                continue;
            }
            match normalize_column(cell(row, 1)) {
                Some(column) => entries.push((id.to_string(), column)),
                None => warn!("Users row {}: '{}' has no valid column ({:?})", i + 1, id, cell(row, 1)),
            }
        }
        Self { entries }
    }

    /// Exact match, first entry wins.
    pub fn column_for(&self, user_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, col)| col.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
