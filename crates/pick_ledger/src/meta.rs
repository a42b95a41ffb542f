use sheet_gateway::{cell, Grid};

/// Round parameters from the `Meta` key/value tab. Read fresh per submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaConfig {
    pub start_row:   Option<u32>,
    pub games_today: Option<u32>,
}

impl MetaConfig {
    /// Rows of `key | value`. Later rows win on duplicate keys.
    /// Non-numeric, zero and negative values count as missing.
    pub fn from_rows(rows: &Grid) -> Self {
        let mut meta = MetaConfig::default();
        for row in rows {
            match cell(row, 0).trim() {
                "start_row"   => meta.start_row   = positive_int(cell(row, 1)),
                "games_today" => meta.games_today = positive_int(cell(row, 1)),
                _ => {}
            }
        }
        meta
    }

    /// Both fields present.
    pub fn complete(&self) -> Option<(u32, u32)> {
        Some((self.start_row?, self.games_today?))
    }
}

fn positive_int(raw: &str) -> Option<u32> {
    let v: f64 = raw.trim().parse().ok()?;
    if v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
