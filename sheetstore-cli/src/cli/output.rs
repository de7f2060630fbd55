//! Rendering of command results

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use serde_json::Value;

use crate::store::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Single-line JSON
    JsonCompact,
    /// Aligned columns
    Table,
    /// Comma-separated values with a header line
    Csv,
}

/// Render any serializable result
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).context("Failed to format JSON output"),
        OutputFormat::JsonCompact => serde_json::to_string(value).context("Failed to format JSON output"),
        OutputFormat::Table => {
            let json = serde_json::to_value(value).context("Failed to serialize output")?;
            Ok(value_table(&json))
        }
        OutputFormat::Csv => {
            let json = serde_json::to_value(value).context("Failed to serialize output")?;
            value_csv(&json)
        }
    }
}

/// Render records, keeping header order in table and CSV output
pub fn render_records(records: &[Record], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => render(&records, format),
        OutputFormat::Table => {
            let columns = record_columns(records);
            let rows: Vec<Vec<String>> = records
                .iter()
                .map(|r| columns.iter().map(|c| r.get_or_empty(c).to_string()).collect())
                .collect();
            Ok(table(&columns, &rows))
        }
        OutputFormat::Csv => {
            let columns = record_columns(records);
            let rows: Vec<Vec<String>> = records
                .iter()
                .map(|r| r.to_ordered_values(&columns))
                .collect();
            csv_text(&columns, &rows)
        }
    }
}

/// Union of record keys in first-seen order
fn record_columns(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|r| r.keys()) {
        if !columns.iter().any(|c| c == key) {
            columns.push(key.to_string());
        }
    }
    columns
}

fn table(columns: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "No rows".dimmed().to_string();
    }

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r.get(i).map(|v| v.chars().count()).unwrap_or(0))
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    out.push_str(&header.join("  ").bold().to_string());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  ").dimmed().to_string());
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| format!("{:<w$}", row.get(i).map(String::as_str).unwrap_or(""), w = *w))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }

    out.push_str(&format!("{} row(s)", rows.len()).dimmed().to_string());
    out
}

fn csv_text(columns: &[String], rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns).context("Failed to write CSV header")?;
    for row in rows {
        writer.write_record(row).context("Failed to write CSV row")?;
    }
    let bytes = writer.into_inner().context("Failed to finish CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Arrays of objects become rows; a single object becomes key/value pairs
fn value_rows(value: &Value) -> (Vec<String>, Vec<Vec<String>>) {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) => {
            let mut columns: Vec<String> = Vec::new();
            for item in items.iter().filter_map(Value::as_object) {
                for key in item.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            let rows = items
                .iter()
                .filter_map(Value::as_object)
                .map(|obj| {
                    columns
                        .iter()
                        .map(|c| obj.get(c).map(scalar).unwrap_or_default())
                        .collect()
                })
                .collect();
            (columns, rows)
        }
        Value::Object(obj) => (
            vec!["key".to_string(), "value".to_string()],
            obj.iter().map(|(k, v)| vec![k.clone(), scalar(v)]).collect(),
        ),
        other => (vec!["value".to_string()], vec![vec![scalar(other)]]),
    }
}

fn value_table(value: &Value) -> String {
    let (columns, rows) = value_rows(value);
    table(&columns, &rows)
}

fn value_csv(value: &Value) -> Result<String> {
    let (columns, rows) = value_rows(value);
    csv_text(&columns, &rows)
}
