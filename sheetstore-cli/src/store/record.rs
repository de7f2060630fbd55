//! Records: header-keyed rows of string cells

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::api::models::cell_to_string;

/// Ordered mapping of column name to cell value.
///
/// Insertion order is kept (header order when built from a sheet). Keys are
/// unique: inserting an existing key replaces its value in place. Values are
/// never coerced; callers parse numbers, booleans and dates themselves.
/// Equality ignores key order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a header row and one data row.
    /// Cells missing from a short row become empty strings.
    pub fn from_row(headers: &[String], row: &[String]) -> Self {
        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            let value = row.get(i).cloned().unwrap_or_default();
            record.insert(header.clone(), value);
        }
        record
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Record::new();
        for (k, v) in pairs {
            record.insert(k, v);
        }
        record
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Cell value, or `""` when the column is absent
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == column)
    }

    /// Set a value, replacing an existing one in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        let pos = self.fields.iter().position(|(k, _)| k == column)?;
        Some(self.fields.remove(pos).1)
    }

    /// Shallow, column-by-column merge: values in `overrides` win
    pub fn merged(&self, overrides: &Record) -> Record {
        let mut merged = self.clone();
        for (k, v) in overrides.iter() {
            merged.insert(k, v);
        }
        merged
    }

    /// Flatten into cell values following `columns`; absent columns become `""`
    pub fn to_ordered_values(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.get_or_empty(c).to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build from a JSON object. Strings are kept verbatim, numbers use their
    /// JSON text, booleans become `TRUE`/`FALSE` and null becomes `""`.
    pub fn from_json(value: &Value) -> Option<Record> {
        let object = value.as_object()?;
        Some(Record::from_pairs(
            object.iter().map(|(k, v)| (k.clone(), cell_to_string(v))),
        ))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Record {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record::from_pairs(iter)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "an object of column names to cell values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    record.insert(key, cell_to_string(&value));
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A record plus its 1-based data-row index (1 = the row under the header).
///
/// The index is positional: it is only valid immediately after the scan that
/// produced it. Any row inserted or deleted above it shifts the real row, so
/// callers must re-resolve the handle before each destructive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowHandle {
    pub row_index: usize,
    pub record: Record,
}

impl RowHandle {
    /// 1-based row number in the sheet (header is row 1)
    pub fn sheet_row(&self) -> usize {
        self.row_index + 1
    }

    /// 0-based position in the whole sheet, as used by structural edits
    pub fn positional_index(&self) -> usize {
        self.row_index
    }
}

/// Result of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl SheetData {
    /// Rebuild records from a raw grid whose first row is the header
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return SheetData::default();
        }
        let headers = grid.remove(0);
        Self::from_headers_and_rows(headers, &grid)
    }

    pub fn from_headers_and_rows(headers: Vec<String>, rows: &[Vec<String>]) -> Self {
        let rows = rows.iter().map(|row| Record::from_row(&headers, row)).collect();
        SheetData { headers, rows }
    }

    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}
