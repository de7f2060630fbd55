//! Spreadsheet-level commands: info, health and column checks

use anyhow::Result;
use chrono::Utc;
use colored::*;
use futures::future::try_join_all;
use serde::Serialize;

use crate::api::BackendErrorKind;
use crate::cli::output::{OutputFormat, render};
use crate::config::Config;
use crate::repository::{EntityKind, Repositories};
use crate::store::{ColumnDrift, StoreError};

#[derive(Debug, Serialize)]
struct HealthReport {
    connected: bool,
    checked_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    spreadsheet_title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sheets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

/// What to try when the spreadsheet cannot be reached
fn hint_for(err: &StoreError) -> &'static str {
    match err {
        StoreError::BackendUnavailable { source, .. } => match source.kind {
            BackendErrorKind::PermissionDenied => {
                "Share the spreadsheet with the account behind the access token and grant Editor rights, or check that the Sheets API is enabled"
            }
            BackendErrorKind::InvalidRange => {
                "Check that the configured sheet names exist and the headers are in row 1"
            }
            BackendErrorKind::NotFound => {
                "Verify GOOGLE_SHEETS_SPREADSHEET_ID and that the spreadsheet exists"
            }
            BackendErrorKind::RateLimited => "Quota exhausted; wait a minute and retry",
            _ => "Check the spreadsheet configuration and network access",
        },
        _ => "Check the spreadsheet configuration",
    }
}

pub async fn info(config: &Config, format: OutputFormat) -> Result<()> {
    let store = config.row_store()?;
    let metadata = store.spreadsheet_info().await?;
    println!("{}", render(&metadata, format)?);
    Ok(())
}

pub async fn health(config: &Config, format: OutputFormat) -> Result<()> {
    let store = config.row_store()?;
    let checked_at = Utc::now().to_rfc3339();

    let report = match store.spreadsheet_info().await {
        Ok(metadata) => HealthReport {
            connected: true,
            checked_at,
            spreadsheet_title: Some(metadata.title),
            sheets: metadata.sheets.into_iter().map(|s| s.title).collect(),
            error: None,
            hint: None,
        },
        Err(err) => HealthReport {
            connected: false,
            checked_at,
            spreadsheet_title: None,
            sheets: Vec::new(),
            hint: Some(hint_for(&err)),
            error: Some(err.to_string()),
        },
    };

    println!("{}", render(&report, format)?);
    if !report.connected {
        anyhow::bail!("Spreadsheet unavailable");
    }
    Ok(())
}

pub async fn check(
    repos: &Repositories,
    entity: Option<EntityKind>,
    format: OutputFormat,
) -> Result<()> {
    let kinds: Vec<EntityKind> = match entity {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    };

    let reports: Vec<ColumnDrift> =
        try_join_all(kinds.into_iter().map(|kind| repos.get(kind).check_columns())).await?;

    if format == OutputFormat::Table {
        for drift in &reports {
            let status = if drift.is_consistent() {
                "ok".bright_green()
            } else {
                "drift".bright_red()
            };
            println!("{:<16} {}", drift.sheet, status);
            for column in &drift.missing {
                println!("  missing     {}", column.yellow());
            }
            for column in &drift.unexpected {
                println!("  unexpected  {}", column.yellow());
            }
            for m in &drift.misplaced {
                println!(
                    "  misplaced   {} (expected column {}, found {})",
                    m.column.yellow(),
                    m.expected + 1,
                    m.actual + 1
                );
            }
        }
    } else {
        println!("{}", render(&reports, format)?);
    }
    Ok(())
}
