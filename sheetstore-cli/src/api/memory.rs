//! In-process spreadsheet backend
//!
//! Mirrors the observable behaviour of the Sheets values API closely enough
//! for the row store: trailing blank cells and rows are omitted on read,
//! appends land after the last non-blank row, and unknown sheets are range
//! errors. Optionally persisted to a JSON file so the CLI can run offline.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::a1::{A1Range, column_letter, quote_sheet_name};
use super::backend::SheetsBackend;
use super::error::{BackendError, BackendErrorKind};
use super::models::{SheetProperties, SpreadsheetMetadata, WriteKind, WriteReceipt};

/// Grid size reported in metadata for sheets smaller than this
const DEFAULT_GRID_ROWS: u32 = 1000;
const DEFAULT_GRID_COLUMNS: u32 = 26;

/// A single tab held in memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySheet {
    pub title: String,
    pub sheet_id: i64,
    pub rows: Vec<Vec<String>>,
}

impl MemorySheet {
    fn last_non_blank_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemorySnapshot {
    title: String,
    sheets: Vec<MemorySheet>,
}

/// Spreadsheet backend held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemorySnapshot>,
    path: Option<PathBuf>,
    failures: Mutex<VecDeque<BackendError>>,
    yield_between_ops: bool,
    requests: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemorySnapshot {
                title: title.into(),
                sheets: Vec::new(),
            }),
            ..Default::default()
        }
    }

    /// Load a spreadsheet from a JSON file, starting empty if it does not exist.
    /// Every successful write is saved back to the same file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                BackendError::not_found(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                BackendError::malformed(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            MemorySnapshot {
                title: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                sheets: Vec::new(),
            }
        };

        Ok(Self {
            state: Mutex::new(snapshot),
            path: Some(path),
            ..Default::default()
        })
    }

    /// Add a tab (builder style)
    pub fn with_sheet(self, title: &str, rows: Vec<Vec<&str>>) -> Self {
        self.add_sheet(title, rows);
        self
    }

    /// Yield to the scheduler before every operation so concurrent callers interleave
    pub fn with_yielding(mut self) -> Self {
        self.yield_between_ops = true;
        self
    }

    /// Add or replace a tab
    pub fn add_sheet(&self, title: &str, rows: Vec<Vec<&str>>) {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        let mut state = self.lock_state();
        if let Some(sheet) = state.sheets.iter_mut().find(|s| s.title == title) {
            sheet.rows = rows;
            return;
        }
        let sheet_id = state.sheets.iter().map(|s| s.sheet_id + 1).max().unwrap_or(0);
        state.sheets.push(MemorySheet {
            title: title.to_string(),
            sheet_id,
            rows,
        });
    }

    /// Snapshot of a tab's cells
    pub fn rows(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.lock_state()
            .sheets
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.rows.clone())
    }

    /// Make the next operation fail with `err` (queued, one per call)
    pub fn fail_next(&self, err: BackendError) {
        self.failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(err);
    }

    /// Number of operations attempted so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemorySnapshot> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn begin(&self) -> Result<(), BackendError> {
        if self.yield_between_ops {
            tokio::task::yield_now().await;
        }
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap_or_else(|p| p.into_inner()).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Copy of the grid to restore if saving fails; `None` when nothing is saved
    fn snapshot(&self) -> Option<MemorySnapshot> {
        self.path.as_ref().map(|_| self.lock_state().clone())
    }

    /// Save a write, or put the grid back to `before` so a failed write leaves no trace
    fn commit(&self, before: Option<MemorySnapshot>) -> Result<(), BackendError> {
        let Some(before) = before else {
            return Ok(());
        };
        if let Err(err) = self.persist() {
            *self.lock_state() = before;
            return Err(err);
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), BackendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let save_error =
            |message: String| BackendError::new(BackendErrorKind::Other, message);
        let content = serde_json::to_string_pretty(&*self.lock_state())
            .map_err(|e| save_error(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| save_error(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| save_error(format!("Failed to write {}: {}", path.display(), e)))
    }
}

fn unknown_sheet(range: &str) -> BackendError {
    BackendError::invalid_range(format!("Unable to parse range: {}", range)).with_status(400)
}

fn trim_trailing_blanks(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl SheetsBackend for MemoryBackend {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, BackendError> {
        self.begin().await?;
        let a1 = A1Range::parse(range)?;
        let state = self.lock_state();
        let sheet = state
            .sheets
            .iter()
            .find(|s| s.title == a1.sheet)
            .ok_or_else(|| unknown_sheet(range))?;

        let first_row = a1.start_row.unwrap_or(1);
        let last_row = a1.end_row.unwrap_or(usize::MAX).min(sheet.rows.len());
        let first_col = a1.start_col.unwrap_or(0);
        let last_col = a1.end_col.unwrap_or(usize::MAX);

        let mut grid: Vec<Vec<String>> = Vec::new();
        if first_row <= last_row {
            for row in &sheet.rows[first_row - 1..last_row] {
                let cells: Vec<String> = row
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i >= first_col && *i <= last_col)
                    .map(|(_, c)| c.clone())
                    .collect();
                grid.push(trim_trailing_blanks(cells));
            }
        }
        while grid.last().is_some_and(|r| r.is_empty()) {
            grid.pop();
        }

        debug!("memory: read {} rows from {}", grid.len(), range);
        Ok(grid)
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError> {
        self.begin().await?;
        let a1 = A1Range::parse(range)?;
        let before = self.snapshot();
        let receipt = {
            let mut state = self.lock_state();
            let sheet = state
                .sheets
                .iter_mut()
                .find(|s| s.title == a1.sheet)
                .ok_or_else(|| unknown_sheet(range))?;

            let at = sheet.last_non_blank_row();
            let cells = row.len() as u32;
            let end_col = column_letter(row.len().saturating_sub(1));
            sheet.rows.insert(at.min(sheet.rows.len()), row);
            let sheet_row = at + 1;

            WriteReceipt::new(
                WriteKind::Append,
                Some(format!(
                    "{}!A{}:{}{}",
                    quote_sheet_name(&sheet.title),
                    sheet_row,
                    end_col,
                    sheet_row
                )),
                1,
                cells,
            )
        };
        self.commit(before)?;
        Ok(receipt)
    }

    async fn update_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError> {
        self.begin().await?;
        let a1 = A1Range::parse(range)?;
        let start_row = a1
            .start_row
            .ok_or_else(|| BackendError::invalid_range(format!("Update range needs a row: {}", range)))?;
        let start_col = a1.start_col.unwrap_or(0);

        if let Some(end_col) = a1.end_col {
            let width = end_col + 1 - start_col.min(end_col + 1);
            if row.len() > width {
                return Err(BackendError::invalid_range(format!(
                    "Requested writing within range [{}], but tried writing to column [{}]",
                    range,
                    column_letter(start_col + row.len() - 1)
                ))
                .with_status(400));
            }
        }

        let before = self.snapshot();
        {
            let mut state = self.lock_state();
            let sheet = state
                .sheets
                .iter_mut()
                .find(|s| s.title == a1.sheet)
                .ok_or_else(|| unknown_sheet(range))?;

            while sheet.rows.len() < start_row {
                sheet.rows.push(Vec::new());
            }
            let target = &mut sheet.rows[start_row - 1];
            if target.len() < start_col + row.len() {
                target.resize(start_col + row.len(), String::new());
            }
            for (offset, value) in row.iter().enumerate() {
                target[start_col + offset] = value.clone();
            }
        }
        self.commit(before)?;

        Ok(WriteReceipt::new(
            WriteKind::Update,
            Some(range.to_string()),
            1,
            row.len() as u32,
        ))
    }

    async fn delete_rows(
        &self,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<WriteReceipt, BackendError> {
        self.begin().await?;
        if end <= start {
            return Err(BackendError::invalid_range(format!(
                "Invalid row span [{}, {})",
                start, end
            )));
        }
        let before = self.snapshot();
        let removed = {
            let mut state = self.lock_state();
            let sheet = state
                .sheets
                .iter_mut()
                .find(|s| s.sheet_id == sheet_id)
                .ok_or_else(|| BackendError::not_found(format!("No grid with id: {}", sheet_id)))?;

            let len = sheet.rows.len();
            let from = start.min(len);
            let to = end.min(len);
            sheet.rows.drain(from..to);
            end - start
        };
        self.commit(before)?;

        Ok(WriteReceipt::new(WriteKind::DeleteRows, None, removed as u32, 0))
    }

    async fn metadata(&self) -> Result<SpreadsheetMetadata, BackendError> {
        self.begin().await?;
        let state = self.lock_state();
        Ok(SpreadsheetMetadata {
            title: state.title.clone(),
            sheets: state
                .sheets
                .iter()
                .map(|s| SheetProperties {
                    title: s.title.clone(),
                    sheet_id: s.sheet_id,
                    row_count: (s.rows.len() as u32).max(DEFAULT_GRID_ROWS),
                    column_count: s
                        .rows
                        .iter()
                        .map(|r| r.len() as u32)
                        .max()
                        .unwrap_or(0)
                        .max(DEFAULT_GRID_COLUMNS),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        MemoryBackend::new("Shop").with_sheet(
            "Products",
            vec![
                vec!["Product ID", "Product Name", "Current Stock"],
                vec!["PROD001", "Widget", "5", ""],
                vec!["PROD002", "Gadget"],
            ],
        )
    }

    #[tokio::test]
    async fn test_get_values_trims_trailing_blanks() {
        let b = backend();
        let grid = b.get_values("Products").await.unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[1], vec!["PROD001", "Widget", "5"]);
        assert_eq!(grid[2], vec!["PROD002", "Gadget"]);
    }

    #[tokio::test]
    async fn test_get_values_window() {
        let b = backend();
        assert_eq!(b.get_values("Products!A2:B2").await.unwrap(), vec![vec!["PROD001", "Widget"]]);
        assert_eq!(b.get_values("Products!1:1").await.unwrap().len(), 1);
        assert!(b.get_values("Products!A10:Z20").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_sheet_is_range_error() {
        let err = backend().get_values("Nope!A1:B2").await.unwrap_err();
        assert_eq!(err.kind, super::super::error::BackendErrorKind::InvalidRange);
    }

    #[tokio::test]
    async fn test_append_after_last_non_blank_row() {
        let b = backend();
        let receipt = b
            .append_row("Products", vec!["PROD003".into(), "Doohickey".into(), "1".into()])
            .await
            .unwrap();
        assert_eq!(receipt.updated_range.as_deref(), Some("Products!A4:C4"));
        assert_eq!(b.rows("Products").unwrap()[3][0], "PROD003");
    }

    #[tokio::test]
    async fn test_update_rejects_overflowing_range() {
        let b = backend();
        let err = b
            .update_row("Products!A2:B2", vec!["a".into(), "b".into(), "c".into()])
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(400));
    }

    #[tokio::test]
    async fn test_delete_rows_by_sheet_id() {
        let b = backend();
        let meta = b.metadata().await.unwrap();
        let id = meta.sheet("Products").unwrap().sheet_id;
        b.delete_rows(id, 1, 2).await.unwrap();
        let rows = b.rows("Products").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "PROD002");
        assert!(b.delete_rows(99, 1, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let b = backend();
        b.fail_next(BackendError::rate_limited("quota"));
        assert!(b.get_values("Products").await.is_err());
        assert!(b.get_values("Products").await.is_ok());
        assert_eq!(b.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_grid_unchanged() {
        let dir = std::env::temp_dir().join(format!("sheetstore-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let b = MemoryBackend::open(blocker.join("shop.json"))
            .unwrap()
            .with_sheet("Products", vec![vec!["Product ID"]]);

        let err = b
            .append_row("Products", vec!["PROD001".into()])
            .await
            .unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Other);
        assert!(!crate::api::resilience::RetryableError::is_retryable(&err));
        assert_eq!(b.rows("Products").unwrap(), vec![vec!["Product ID".to_string()]]);

        assert!(b.update_row("Products!A1:A1", vec!["Key".into()]).await.is_err());
        assert_eq!(b.rows("Products").unwrap()[0][0], "Product ID");

        std::fs::remove_dir_all(&dir).ok();
    }
}
