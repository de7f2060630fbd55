//! Wire models for the Sheets v4 REST API and the receipts handed back to callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of write that produced a [`WriteReceipt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    Append,
    Update,
    DeleteRows,
}

impl WriteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteKind::Append => "append",
            WriteKind::Update => "update",
            WriteKind::DeleteRows => "delete_rows",
        }
    }
}

/// Outcome of a single all-or-nothing write against the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub kind: WriteKind,
    /// A1 range the backend reports as touched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_range: Option<String>,
    pub updated_rows: u32,
    pub updated_cells: u32,
}

impl WriteReceipt {
    pub fn new(kind: WriteKind, updated_range: Option<String>, rows: u32, cells: u32) -> Self {
        Self {
            kind,
            updated_range,
            updated_rows: rows,
            updated_cells: cells,
        }
    }
}

/// One tab of the spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub title: String,
    /// Opaque numeric id required for structural edits
    pub sheet_id: i64,
    pub row_count: u32,
    pub column_count: u32,
}

/// Spreadsheet-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetMetadata {
    pub title: String,
    pub sheets: Vec<SheetProperties>,
}

impl SpreadsheetMetadata {
    /// Find a tab by its exact title
    pub fn sheet(&self, title: &str) -> Option<&SheetProperties> {
        self.sheets.iter().find(|s| s.title == title)
    }
}

// === Raw Sheets v4 payloads ===

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    /// Flatten JSON cells into strings; the API normally returns formatted strings
    pub fn into_grid(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell_to_string(&cell)).collect())
            .collect()
    }
}

/// Render a JSON cell as the string the sheet would display
pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
    #[serde(default)]
    pub updated_cells: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    #[serde(default)]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSpreadsheet {
    #[serde(default)]
    pub properties: Option<RawSpreadsheetProperties>,
    #[serde(default)]
    pub sheets: Vec<RawSheet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSpreadsheetProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSheet {
    pub properties: RawSheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub grid_properties: Option<RawGridProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

impl From<RawSpreadsheet> for SpreadsheetMetadata {
    fn from(raw: RawSpreadsheet) -> Self {
        SpreadsheetMetadata {
            title: raw.properties.map(|p| p.title).unwrap_or_default(),
            sheets: raw
                .sheets
                .into_iter()
                .map(|s| {
                    let grid = s.properties.grid_properties;
                    SheetProperties {
                        title: s.properties.title,
                        sheet_id: s.properties.sheet_id,
                        row_count: grid.as_ref().map(|g| g.row_count).unwrap_or(0),
                        column_count: grid.as_ref().map(|g| g.column_count).unwrap_or(0),
                    }
                })
                .collect(),
        }
    }
}

/// Error envelope returned by Google APIs
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_range_into_grid() {
        let raw: ValueRange = serde_json::from_value(json!({
            "range": "Products!A1:E3",
            "majorDimension": "ROWS",
            "values": [["Product ID", "Current Stock"], ["PROD001", 5], ["PROD002", true]]
        }))
        .unwrap();

        let grid = raw.into_grid();
        assert_eq!(grid[1], vec!["PROD001", "5"]);
        assert_eq!(grid[2], vec!["PROD002", "TRUE"]);
    }

    #[test]
    fn test_value_range_without_values() {
        let raw: ValueRange = serde_json::from_value(json!({"range": "Empty!A1:Z1000"})).unwrap();
        assert!(raw.into_grid().is_empty());
    }

    #[test]
    fn test_metadata_from_raw() {
        let raw: RawSpreadsheet = serde_json::from_value(json!({
            "properties": {"title": "Shop"},
            "sheets": [
                {"properties": {"sheetId": 0, "title": "Products",
                    "gridProperties": {"rowCount": 1000, "columnCount": 26}}},
                {"properties": {"sheetId": 42, "title": "Batches"}}
            ]
        }))
        .unwrap();

        let meta = SpreadsheetMetadata::from(raw);
        assert_eq!(meta.title, "Shop");
        assert_eq!(meta.sheet("Batches").map(|s| s.sheet_id), Some(42));
        assert_eq!(meta.sheet("Products").map(|s| s.row_count), Some(1000));
        assert!(meta.sheet("Orders").is_none());
    }
}
