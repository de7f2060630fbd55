//! Schema-aware repository over one entity sheet

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

use super::schema::EntitySchema;
use crate::api::{KeyedLocks, WriteReceipt};
use crate::query::coerce::{bool_cell, format_number, to_number};
use crate::store::{
    ColumnDrift, ListWindow, Record, RowHandle, RowStore, SheetData, StoreError, StoreResult,
};

/// Absolute or relative change to a numeric cell.
///
/// `absolute` wins when both are given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub absolute: Option<f64>,
    pub delta: Option<f64>,
}

impl Adjustment {
    pub fn absolute(value: f64) -> Self {
        Self {
            absolute: Some(value),
            delta: None,
        }
    }

    pub fn delta(value: f64) -> Self {
        Self {
            absolute: None,
            delta: Some(value),
        }
    }

    /// New value given the current one, or `None` when neither part is set
    pub fn apply(&self, current: f64) -> Option<f64> {
        match (self.absolute, self.delta) {
            (Some(absolute), _) => Some(absolute),
            (None, Some(delta)) => Some(current + delta),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Created {
    pub record: Record,
    pub receipt: WriteReceipt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Updated {
    pub previous: Record,
    pub current: Record,
    pub receipt: WriteReceipt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjusted {
    pub field: String,
    /// Raw cell text before the change
    pub previous: String,
    pub current: String,
    pub record: Record,
    pub receipt: WriteReceipt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Removed {
    pub record: Record,
    pub receipt: WriteReceipt,
}

/// CRUD over one entity sheet.
///
/// Every mutation re-resolves its row by key right before writing; row
/// handles are never cached. Without key locks a concurrent read-merge-write
/// on the same row can lose one of the merges.
#[derive(Debug, Clone)]
pub struct EntityRepository {
    schema: EntitySchema,
    store: RowStore,
    locks: Option<Arc<KeyedLocks>>,
}

impl EntityRepository {
    pub fn new(schema: EntitySchema, store: RowStore) -> Self {
        Self {
            schema,
            store,
            locks: None,
        }
    }

    /// Serialize read-merge-write sequences per key through `locks`
    pub fn with_locks(mut self, locks: Arc<KeyedLocks>) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn sheet(&self) -> &str {
        &self.schema.sheet_name
    }

    /// Lock the natural key `key`
    async fn guard(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.lock(self.sheet(), &self.schema.natural_key, key).await),
            None => None,
        }
    }

    /// Lock the row where `column == value` by its natural key.
    ///
    /// A lookup through another column resolves the key first; callers
    /// re-read the row once the guard is held.
    async fn guard_row(&self, column: &str, value: &str) -> StoreResult<Option<OwnedMutexGuard<()>>> {
        if self.locks.is_none() {
            return Ok(None);
        }
        if column == self.schema.natural_key {
            return Ok(self.guard(value).await);
        }
        let handle = self.get_by_key(column, value).await?;
        let key = handle.record.get_or_empty(&self.schema.natural_key).to_string();
        Ok(self.guard(&key).await)
    }

    /// Rows in a page window or an explicit range
    pub async fn list(&self, window: &ListWindow) -> StoreResult<Vec<Record>> {
        let data = match window {
            ListWindow::Range(range) => self.store.scan(self.sheet(), Some(range.as_str())).await?,
            ListWindow::Page(page) => {
                self.store
                    .scan_window(self.sheet(), page.first_row(), page.last_row())
                    .await?
            }
        };
        Ok(data.rows)
    }

    /// Every row, keyed by the live header
    pub async fn scan_all(&self) -> StoreResult<SheetData> {
        self.store.scan(self.sheet(), None).await
    }

    pub async fn get_by_key(&self, column: &str, value: &str) -> StoreResult<RowHandle> {
        self.store
            .find_by_column_value(self.sheet(), column, value)
            .await?
            .ok_or_else(|| StoreError::not_found(self.sheet(), column, value))
    }

    /// Lookup by the natural key
    pub async fn get(&self, key: &str) -> StoreResult<RowHandle> {
        self.get_by_key(&self.schema.natural_key, key).await
    }

    pub async fn find_all(&self, column: &str, value: &str) -> StoreResult<Vec<Record>> {
        self.store
            .find_all_by_column_value(self.sheet(), column, value)
            .await
    }

    /// Append a new row in schema column order.
    ///
    /// The natural key must be present. For unique keys an existing row with
    /// the same key is a conflict. Absent or empty columns with a default get it.
    pub async fn create(&self, record: &Record) -> StoreResult<Created> {
        let key_column = &self.schema.natural_key;
        let key = record.get_or_empty(key_column).to_string();
        if key.trim().is_empty() {
            return Err(StoreError::MissingParameter(format!(
                "{} is required to create a {}",
                key_column,
                self.schema.kind.label()
            )));
        }

        let _guard = self.guard(&key).await;

        if self.schema.unique_key
            && self
                .store
                .find_by_column_value(self.sheet(), key_column, &key)
                .await?
                .is_some()
        {
            return Err(StoreError::Conflict {
                sheet: self.sheet().to_string(),
                column: key_column.clone(),
                value: key,
            });
        }

        let mut complete = record.clone();
        for (column, default) in &self.schema.defaults {
            if complete.get_or_empty(column).is_empty() {
                complete.insert(column.clone(), default.clone());
            }
        }

        let values = complete.to_ordered_values(&self.schema.columns);
        let stored: Record = self
            .schema
            .columns
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();

        let receipt = self.store.append(self.sheet(), values).await?;
        info!("Created {} '{}'", self.schema.kind.label(), key);

        Ok(Created {
            record: stored,
            receipt,
        })
    }

    /// Merge `partial` into the row where `column == value` and rewrite the row
    pub async fn update(&self, column: &str, value: &str, partial: &Record) -> StoreResult<Updated> {
        let _guard = self.guard_row(column, value).await?;
        self.merge_and_write(column, value, partial).await
    }

    async fn merge_and_write(
        &self,
        column: &str,
        value: &str,
        partial: &Record,
    ) -> StoreResult<Updated> {
        let handle = self.get_by_key(column, value).await?;
        self.write_merged(handle, partial).await
    }

    async fn write_merged(&self, handle: RowHandle, partial: &Record) -> StoreResult<Updated> {
        let merged = handle.record.merged(partial);
        let values = merged.to_ordered_values(&self.schema.columns);

        let receipt = self.store.update_row(self.sheet(), &handle, values).await?;

        Ok(Updated {
            previous: handle.record,
            current: merged,
            receipt,
        })
    }

    /// Set or shift a numeric column. The result may not go below zero.
    pub async fn adjust_numeric_field(
        &self,
        column: &str,
        value: &str,
        field: &str,
        adjustment: Adjustment,
    ) -> StoreResult<Adjusted> {
        if adjustment.absolute.is_none() && adjustment.delta.is_none() {
            return Err(StoreError::MissingParameter(format!(
                "either an absolute value or a delta for {}",
                field
            )));
        }
        if !self.schema.has_column(field) {
            return Err(StoreError::ValidationFailed(format!(
                "'{}' is not a column of {}",
                field,
                self.sheet()
            )));
        }

        let _guard = self.guard_row(column, value).await?;

        let handle = self.get_by_key(column, value).await?;
        let previous = handle.record.get_or_empty(field).to_string();
        let next = adjustment
            .apply(to_number(&previous))
            .ok_or_else(|| StoreError::MissingParameter(field.to_string()))?;

        if !next.is_finite() {
            return Err(StoreError::ValidationFailed(format!(
                "{} must be a finite number",
                field
            )));
        }
        if next < 0.0 {
            return Err(StoreError::ValidationFailed(format!(
                "{} cannot be negative (would be {})",
                field,
                format_number(next)
            )));
        }

        let current = format_number(next);
        let partial = Record::from_pairs([(field, current.as_str())]);
        let updated = self.write_merged(handle, &partial).await?;

        info!(
            "{} of {} '{}': {} -> {}",
            field,
            self.schema.kind.label(),
            value,
            if previous.is_empty() { "(empty)" } else { previous.as_str() },
            current
        );

        Ok(Adjusted {
            field: field.to_string(),
            previous,
            current,
            record: updated.current,
            receipt: updated.receipt,
        })
    }

    /// Write `TRUE`/`FALSE` into a boolean column
    pub async fn set_flag(
        &self,
        column: &str,
        value: &str,
        field: &str,
        flag: bool,
    ) -> StoreResult<Updated> {
        let partial = Record::from_pairs([(field, bool_cell(flag))]);
        self.update(column, value, &partial).await
    }

    /// Delete the row where `column == value`. Rows below it move up.
    pub async fn remove(&self, column: &str, value: &str) -> StoreResult<Removed> {
        let _guard = self.guard_row(column, value).await?;

        let handle = self.get_by_key(column, value).await?;
        let receipt = self
            .store
            .delete_row(self.sheet(), handle.positional_index())
            .await?;
        info!("Deleted {} where {} = '{}'", self.schema.kind.label(), column, value);

        Ok(Removed {
            record: handle.record,
            receipt,
        })
    }

    /// Compare the write column order with the live header
    pub async fn check_columns(&self) -> StoreResult<ColumnDrift> {
        let drift = self
            .store
            .check_column_order(self.sheet(), &self.schema.columns)
            .await?;
        if !drift.is_consistent() {
            warn!(
                "Column drift in '{}': missing {:?}, unexpected {:?}, misplaced {}",
                self.sheet(),
                drift.missing,
                drift.unexpected,
                drift.misplaced.len()
            );
        }
        Ok(drift)
    }
}
