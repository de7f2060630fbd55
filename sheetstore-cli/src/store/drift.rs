//! Comparison of a configured write order against the live header row

use serde::Serialize;

/// A configured column found at a different position in the sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MisplacedColumn {
    pub column: String,
    pub expected: usize,
    pub actual: usize,
}

/// Differences between a write order and the sheet's header row.
///
/// Any drift means appends and updates will put values under the wrong
/// headers. Nothing is corrected automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDrift {
    pub sheet: String,
    /// Configured but not in the header
    pub missing: Vec<String>,
    /// In the header but not configured
    pub unexpected: Vec<String>,
    pub misplaced: Vec<MisplacedColumn>,
}

impl ColumnDrift {
    pub fn compare(sheet: &str, configured: &[String], headers: &[String]) -> Self {
        let mut missing = Vec::new();
        let mut misplaced = Vec::new();

        for (expected, column) in configured.iter().enumerate() {
            match headers.iter().position(|h| h == column) {
                None => missing.push(column.clone()),
                Some(actual) if actual != expected => misplaced.push(MisplacedColumn {
                    column: column.clone(),
                    expected,
                    actual,
                }),
                Some(_) => {}
            }
        }

        let unexpected = headers
            .iter()
            .filter(|h| !h.is_empty() && !configured.contains(h))
            .cloned()
            .collect();

        ColumnDrift {
            sheet: sheet.to_string(),
            missing,
            unexpected,
            misplaced,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.misplaced.is_empty()
    }
}
