//! The narrow interface the row store consumes from a spreadsheet client

use async_trait::async_trait;

use super::error::BackendError;
use super::models::{SpreadsheetMetadata, WriteReceipt};

/// Backing store client for one spreadsheet.
///
/// Ranges are fully qualified A1 strings such as `Products!A1:Z1000` or
/// `'Order Details'!A2:G2`. Authentication is entirely the implementor's
/// concern; auth failures surface as [`BackendError`]s like any other.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Read a grid of display strings. Trailing empty cells and rows may be omitted.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, BackendError>;

    /// Append one row after the last non-empty row of the table at `range`
    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError>;

    /// Overwrite the cells of `range` with one row of values
    async fn update_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError>;

    /// Delete rows `[start, end)` (0-based, whole sheet) of the tab with `sheet_id`
    async fn delete_rows(
        &self,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<WriteReceipt, BackendError>;

    /// Spreadsheet title and tabs
    async fn metadata(&self) -> Result<SpreadsheetMetadata, BackendError>;
}
