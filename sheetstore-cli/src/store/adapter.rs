//! Sheet-backed row store
//!
//! Maps a header-driven grid of strings onto [`Record`]s. Reads go through the
//! live header row; writes take caller-ordered value arrays and never look at
//! the header. Every backend request passes through the retry policy and the
//! concurrency limiter, and failures are wrapped with the operation and sheet.
//! Appends and positional deletes are retried only after quota rejections: a
//! timed-out append may have landed, and a repeated delete would remove the
//! row that moved up into the same position.

use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::drift::ColumnDrift;
use super::error::{StoreError, StoreResult};
use super::record::{Record, RowHandle, SheetData};
use crate::api::a1::{column_letter, qualify};
use crate::api::resilience::{
    ConcurrencyLimiter, Idempotency, MonitoringConfig, ResilienceConfig, RetryPolicy,
};
use crate::api::{BackendError, SheetsBackend, SpreadsheetMetadata, WriteReceipt};

/// Minimum column span of a paged read (A:Z)
const MIN_WINDOW_COLUMNS: usize = 26;

/// Row store over one spreadsheet
#[derive(Clone)]
pub struct RowStore {
    backend: Arc<dyn SheetsBackend>,
    retry: RetryPolicy,
    limiter: ConcurrencyLimiter,
    monitoring: MonitoringConfig,
}

impl std::fmt::Debug for RowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStore")
            .field("retry", &self.retry)
            .field("limiter", &self.limiter.stats())
            .finish_non_exhaustive()
    }
}

impl RowStore {
    pub fn new(backend: Arc<dyn SheetsBackend>, config: &ResilienceConfig) -> Self {
        Self {
            backend,
            retry: RetryPolicy::new(config.retry.clone()),
            limiter: ConcurrencyLimiter::new(config.concurrency.clone()),
            monitoring: config.monitoring.clone(),
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Run one backend request with retry, a concurrency permit per attempt and logging
    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        sheet: &str,
        target: &str,
        idempotency: Idempotency,
        mut request: F,
    ) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let correlation = if self.monitoring.correlation_ids {
            let id = Uuid::new_v4().simple().to_string();
            format!("[{}] ", &id[..8])
        } else {
            String::new()
        };
        let label = format!("{}{} {}", correlation, operation, target);
        let started = Instant::now();

        if self.monitoring.request_logging {
            debug!("{}", label);
        }

        let limiter = &self.limiter;
        let result = self
            .retry
            .execute_with(&label, idempotency, || {
                let pending = request();
                async move {
                    let _permit = limiter.acquire().await;
                    pending.await
                }
            })
            .await;

        if self.monitoring.request_logging {
            debug!(
                "{} finished in {:?} ({})",
                label,
                started.elapsed(),
                if result.is_ok() { "ok" } else { "error" }
            );
        }

        result.map_err(|e| StoreError::backend(operation, sheet, e))
    }

    async fn read_grid(&self, sheet: &str, target: &str) -> StoreResult<Vec<Vec<String>>> {
        self.call("read", sheet, target, Idempotency::Idempotent, || {
            self.backend.get_values(target)
        })
        .await
    }

    /// Read a whole sheet, or a range of it whose first row is taken as the header.
    ///
    /// An empty target gives empty headers and rows.
    pub async fn scan(&self, sheet: &str, range: Option<&str>) -> StoreResult<SheetData> {
        let target = qualify(sheet, range);
        let grid = self.read_grid(sheet, &target).await?;
        Ok(SheetData::from_grid(grid))
    }

    /// The header row, empty if the sheet is empty
    pub async fn header_row(&self, sheet: &str) -> StoreResult<Vec<String>> {
        let target = qualify(sheet, Some("1:1"));
        let grid = self.read_grid(sheet, &target).await?;
        Ok(grid.into_iter().next().unwrap_or_default())
    }

    /// Read sheet rows `first_row..=last_row` keyed by the real header row
    pub async fn scan_window(
        &self,
        sheet: &str,
        first_row: u64,
        last_row: u64,
    ) -> StoreResult<SheetData> {
        if first_row < 2 || last_row < first_row {
            return Err(StoreError::ValidationFailed(format!(
                "Invalid data window {}..{} (data starts at row 2)",
                first_row, last_row
            )));
        }

        let headers = self.header_row(sheet).await?;
        if headers.is_empty() {
            return Ok(SheetData::default());
        }

        let last_col = column_letter(headers.len().max(MIN_WINDOW_COLUMNS) - 1);
        let window = format!("A{}:{}{}", first_row, last_col, last_row);
        let target = qualify(sheet, Some(&window));
        let rows = self.read_grid(sheet, &target).await?;

        Ok(SheetData::from_headers_and_rows(headers, &rows))
    }

    /// First row whose `column` cell equals `value` exactly (case-sensitive, untrimmed).
    ///
    /// `Ok(None)` when nothing matches; `ColumnNotFound` when the header lacks `column`.
    pub async fn find_by_column_value(
        &self,
        sheet: &str,
        column: &str,
        value: &str,
    ) -> StoreResult<Option<RowHandle>> {
        let data = self.scan(sheet, None).await?;
        require_column(&data, sheet, column)?;

        let found = data
            .rows
            .into_iter()
            .enumerate()
            .find(|(_, record)| record.get(column) == Some(value))
            .map(|(i, record)| RowHandle {
                row_index: i + 1,
                record,
            });

        debug!(
            "find {}.{} = '{}': {}",
            sheet,
            column,
            value,
            found
                .as_ref()
                .map(|h| format!("row {}", h.sheet_row()))
                .unwrap_or_else(|| "no match".to_string())
        );
        Ok(found)
    }

    /// Every row whose `column` cell equals `value` exactly, in sheet order
    pub async fn find_all_by_column_value(
        &self,
        sheet: &str,
        column: &str,
        value: &str,
    ) -> StoreResult<Vec<Record>> {
        let data = self.scan(sheet, None).await?;
        require_column(&data, sheet, column)?;

        Ok(data
            .rows
            .into_iter()
            .filter(|record| record.get(column) == Some(value))
            .collect())
    }

    /// Append one row after the data region. Values land in caller order.
    pub async fn append(&self, sheet: &str, values: Vec<String>) -> StoreResult<WriteReceipt> {
        let target = qualify(sheet, None);
        let receipt = self
            .call(
                "append to",
                sheet,
                &target,
                Idempotency::NonIdempotent,
                || self.backend.append_row(&target, values.clone()),
            )
            .await?;
        info!(
            "Appended row to '{}' ({})",
            sheet,
            receipt.updated_range.as_deref().unwrap_or("range not reported")
        );
        Ok(receipt)
    }

    /// Overwrite the whole row at `handle` with `values`
    pub async fn update_row(
        &self,
        sheet: &str,
        handle: &RowHandle,
        values: Vec<String>,
    ) -> StoreResult<WriteReceipt> {
        if values.is_empty() {
            return Err(StoreError::ValidationFailed(
                "Row update needs at least one value".to_string(),
            ));
        }

        let row = handle.sheet_row();
        let range = format!("A{}:{}{}", row, column_letter(values.len() - 1), row);
        let target = qualify(sheet, Some(&range));
        let receipt = self
            .call("update", sheet, &target, Idempotency::Idempotent, || {
                self.backend.update_row(&target, values.clone())
            })
            .await?;
        info!("Updated row {} of '{}'", row, sheet);
        Ok(receipt)
    }

    /// Delete the row at a 0-based whole-sheet position (0 is the header).
    /// All rows below move up by one.
    pub async fn delete_row(&self, sheet: &str, positional_index: usize) -> StoreResult<WriteReceipt> {
        if positional_index == 0 {
            return Err(StoreError::ValidationFailed(format!(
                "Refusing to delete the header row of '{}'",
                sheet
            )));
        }

        let sheet_id = self.resolve_sheet_id(sheet).await?;
        let target = format!("{} (id {}) row {}", sheet, sheet_id, positional_index + 1);
        let receipt = self
            .call(
                "delete a row from",
                sheet,
                &target,
                Idempotency::NonIdempotent,
                || {
                    self.backend
                        .delete_rows(sheet_id, positional_index, positional_index + 1)
                },
            )
            .await?;
        info!("Deleted row {} of '{}'", positional_index + 1, sheet);
        Ok(receipt)
    }

    /// Opaque id of a tab, needed for structural edits
    pub async fn resolve_sheet_id(&self, sheet: &str) -> StoreResult<i64> {
        let metadata = self
            .call(
                "resolve",
                sheet,
                "spreadsheet metadata",
                Idempotency::Idempotent,
                || self.backend.metadata(),
            )
            .await?;
        metadata
            .sheet(sheet)
            .map(|s| s.sheet_id)
            .ok_or_else(|| StoreError::SheetNotFound {
                sheet: sheet.to_string(),
            })
    }

    /// Spreadsheet title and tabs
    pub async fn spreadsheet_info(&self) -> StoreResult<SpreadsheetMetadata> {
        self.call(
            "describe",
            "(spreadsheet)",
            "spreadsheet metadata",
            Idempotency::Idempotent,
            || {
            self.backend.metadata()
        })
        .await
    }

    /// Compare a configured write order with the live header row
    pub async fn check_column_order(
        &self,
        sheet: &str,
        columns: &[String],
    ) -> StoreResult<ColumnDrift> {
        let headers = self.header_row(sheet).await?;
        Ok(ColumnDrift::compare(sheet, columns, &headers))
    }
}

fn require_column(data: &SheetData, sheet: &str, column: &str) -> StoreResult<()> {
    match data.column_position(column) {
        Some(_) => Ok(()),
        None => Err(StoreError::ColumnNotFound {
            sheet: sheet.to_string(),
            column: column.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resilience::RetryConfig;
    use crate::api::{BackendErrorKind, MemoryBackend};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Applies every request, then reports the first write as timed out
    struct TimesOutAfterWrite {
        inner: Arc<MemoryBackend>,
        tripped: AtomicBool,
    }

    impl TimesOutAfterWrite {
        fn new(inner: Arc<MemoryBackend>) -> Self {
            Self {
                inner,
                tripped: AtomicBool::new(false),
            }
        }

        fn after_write(&self, receipt: WriteReceipt) -> Result<WriteReceipt, BackendError> {
            if self.tripped.swap(true, Ordering::SeqCst) {
                Ok(receipt)
            } else {
                Err(BackendError::transient("operation timed out"))
            }
        }
    }

    #[async_trait]
    impl SheetsBackend for TimesOutAfterWrite {
        async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, BackendError> {
            self.inner.get_values(range).await
        }

        async fn append_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError> {
            let receipt = self.inner.append_row(range, row).await?;
            self.after_write(receipt)
        }

        async fn update_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError> {
            let receipt = self.inner.update_row(range, row).await?;
            self.after_write(receipt)
        }

        async fn delete_rows(
            &self,
            sheet_id: i64,
            start: usize,
            end: usize,
        ) -> Result<WriteReceipt, BackendError> {
            let receipt = self.inner.delete_rows(sheet_id, start, end).await?;
            self.after_write(receipt)
        }

        async fn metadata(&self) -> Result<SpreadsheetMetadata, BackendError> {
            self.inner.metadata().await
        }
    }

    const PRODUCT_HEADER: [&str; 5] = [
        "Product ID",
        "Product Name",
        "Selling Price",
        "Current Stock",
        "Min Stock",
    ];

    fn products() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new("Shop").with_sheet(
            "Products",
            vec![
                PRODUCT_HEADER.to_vec(),
                vec!["PROD001", "Widget", "9.99", "5", "10"],
                vec!["PROD002", "widget", "4.50", "40", "10"],
                vec!["PROD003", "Gizmo"],
            ],
        ))
    }

    fn store(backend: Arc<MemoryBackend>) -> RowStore {
        let config = ResilienceConfig::builder()
            .retry_config(RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                backoff_multiplier: 2.0,
                jitter: false,
            })
            .build();
        RowStore::new(backend, &config)
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_scan_empty_sheet() {
        let backend = Arc::new(MemoryBackend::new("Shop").with_sheet("Empty", vec![]));
        let data = store(backend).scan("Empty", None).await.unwrap();
        assert!(data.headers.is_empty());
        assert!(data.rows.is_empty());
    }

    #[tokio::test]
    async fn test_scan_header_only_sheet() {
        let backend = Arc::new(MemoryBackend::new("Shop").with_sheet("Products", vec![PRODUCT_HEADER.to_vec()]));
        let data = store(backend).scan("Products", None).await.unwrap();
        assert_eq!(data.headers, strings(&PRODUCT_HEADER));
        assert!(data.rows.is_empty());
    }

    #[tokio::test]
    async fn test_scan_pads_ragged_rows() {
        let data = store(products()).scan("Products", None).await.unwrap();
        assert_eq!(data.rows.len(), 3);
        assert_eq!(data.rows[2].get("Product Name"), Some("Gizmo"));
        assert_eq!(data.rows[2].get("Min Stock"), Some(""));
    }

    #[tokio::test]
    async fn test_scan_window_uses_real_header() {
        let data = store(products()).scan_window("Products", 3, 4).await.unwrap();
        assert_eq!(data.headers, strings(&PRODUCT_HEADER));
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0].get("Product ID"), Some("PROD002"));
    }

    #[tokio::test]
    async fn test_scan_window_past_the_end_is_empty() {
        let data = store(products()).scan_window("Products", 102, 201).await.unwrap();
        assert_eq!(data.headers.len(), 5);
        assert!(data.rows.is_empty());
    }

    #[tokio::test]
    async fn test_find_is_exact_and_case_sensitive() {
        let s = store(products());

        let hit = s
            .find_by_column_value("Products", "Product Name", "widget")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.row_index, 2);
        assert_eq!(hit.record.get("Product ID"), Some("PROD002"));

        assert!(s.find_by_column_value("Products", "Product Name", "WIDGET").await.unwrap().is_none());
        assert!(s.find_by_column_value("Products", "Product Name", " Widget").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_first_match_wins() {
        let backend = Arc::new(MemoryBackend::new("Shop").with_sheet(
            "Order Details",
            vec![
                vec!["Order ID", "Product ID"],
                vec!["ORD001", "PROD001"],
                vec!["ORD001", "PROD002"],
            ],
        ));
        let s = store(backend);
        let hit = s
            .find_by_column_value("Order Details", "Order ID", "ORD001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.row_index, 1);
        assert_eq!(hit.record.get("Product ID"), Some("PROD001"));

        let all = s
            .find_all_by_column_value("Order Details", "Order ID", "ORD001")
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_find_missing_column_is_an_error() {
        let err = store(products())
            .find_by_column_value("Products", "Colour", "red")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ColumnNotFound { ref column, .. } if column == "Colour"));
    }

    #[tokio::test]
    async fn test_update_row_overwrites_full_range() {
        let backend = products();
        let s = store(backend.clone());
        let handle = s
            .find_by_column_value("Products", "Product ID", "PROD002")
            .await
            .unwrap()
            .unwrap();

        let receipt = s
            .update_row("Products", &handle, strings(&["PROD002", "Widget XL", "5.00", "41", "10"]))
            .await
            .unwrap();
        assert_eq!(receipt.updated_range.as_deref(), Some("Products!A3:E3"));
        assert_eq!(backend.rows("Products").unwrap()[2][1], "Widget XL");
    }

    #[tokio::test]
    async fn test_delete_row_shifts_rows_up() {
        let backend = products();
        let s = store(backend.clone());
        let handle = s
            .find_by_column_value("Products", "Product ID", "PROD001")
            .await
            .unwrap()
            .unwrap();

        s.delete_row("Products", handle.positional_index()).await.unwrap();

        let rows = backend.rows("Products").unwrap();
        assert_eq!(rows[0][0], "Product ID");
        assert_eq!(rows[1][0], "PROD002");
        let moved = s
            .find_by_column_value("Products", "Product ID", "PROD002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.row_index, 1);
    }

    #[tokio::test]
    async fn test_delete_header_is_rejected() {
        let err = store(products()).delete_row("Products", 0).await.unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_sheet() {
        let err = store(products()).delete_row("Batches", 1).await.unwrap_err();
        assert_eq!(err, StoreError::SheetNotFound { sheet: "Batches".into() });
    }

    #[tokio::test]
    async fn test_backend_errors_are_wrapped() {
        let backend = products();
        backend.fail_next(BackendError::permission_denied("The caller does not have permission"));
        let err = store(backend).scan("Products", None).await.unwrap_err();
        match err {
            StoreError::BackendUnavailable { operation, sheet, source } => {
                assert_eq!(operation, "read");
                assert_eq!(sheet, "Products");
                assert_eq!(source.kind, BackendErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quota_errors_are_retried() {
        let backend = products();
        backend.fail_next(BackendError::rate_limited("Quota exceeded"));
        backend.fail_next(BackendError::transient("connection reset"));

        let data = store(backend.clone()).scan("Products", None).await.unwrap();
        assert_eq!(data.rows.len(), 3);
        assert_eq!(backend.request_count(), 3);
    }

    #[tokio::test]
    async fn test_permission_errors_are_not_retried() {
        let backend = products();
        backend.fail_next(BackendError::permission_denied("nope"));
        assert!(store(backend.clone()).scan("Products", None).await.is_err());
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_check_column_order() {
        let s = store(products());
        let ok = s.check_column_order("Products", &strings(&PRODUCT_HEADER)).await.unwrap();
        assert!(ok.is_consistent());

        let swapped = strings(&["Product ID", "Selling Price", "Product Name", "Current Stock", "Min Stock"]);
        let drift = s.check_column_order("Products", &swapped).await.unwrap();
        assert_eq!(drift.misplaced.len(), 2);
    }

    fn product_ids(backend: &MemoryBackend) -> Vec<String> {
        backend
            .rows("Products")
            .unwrap()
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_timed_out_delete_is_not_repeated() {
        let backend = products();
        let s = RowStore::new(
            Arc::new(TimesOutAfterWrite::new(backend.clone())),
            &ResilienceConfig::builder()
                .base_delay(Duration::from_millis(1))
                .jitter(false)
                .build(),
        );

        let err = s.delete_row("Products", 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::BackendUnavailable { ref source, .. } if source.kind == BackendErrorKind::Transient
        ));
        assert_eq!(product_ids(&backend), strings(&["Product ID", "PROD002", "PROD003"]));
    }

    #[tokio::test]
    async fn test_timed_out_append_is_not_repeated() {
        let backend = products();
        let s = RowStore::new(
            Arc::new(TimesOutAfterWrite::new(backend.clone())),
            &ResilienceConfig::builder()
                .base_delay(Duration::from_millis(1))
                .jitter(false)
                .build(),
        );

        assert!(s.append("Products", strings(&["PROD004", "D"])).await.is_err());
        assert_eq!(
            product_ids(&backend),
            strings(&["Product ID", "PROD001", "PROD002", "PROD003", "PROD004"])
        );
    }

    #[tokio::test]
    async fn test_timed_out_update_is_retried() {
        let backend = products();
        let s = RowStore::new(
            Arc::new(TimesOutAfterWrite::new(backend.clone())),
            &ResilienceConfig::builder()
                .base_delay(Duration::from_millis(1))
                .jitter(false)
                .build(),
        );
        let handle = s
            .find_by_column_value("Products", "Product ID", "PROD003")
            .await
            .unwrap()
            .unwrap();

        s.update_row("Products", &handle, strings(&["PROD003", "Gizmo Pro"]))
            .await
            .unwrap();
        assert_eq!(backend.rows("Products").unwrap()[3][1], "Gizmo Pro");
    }

    #[tokio::test]
    async fn test_throttled_append_is_retried() {
        let backend = products();
        backend.fail_next(BackendError::from_status(429, "Quota exceeded"));

        store(backend.clone())
            .append("Products", strings(&["PROD004", "D"]))
            .await
            .unwrap();
        assert_eq!(backend.request_count(), 2);
        assert_eq!(product_ids(&backend).len(), 5);
    }
}
