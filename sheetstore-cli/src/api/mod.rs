//! Spreadsheet backend access
//!
//! The [`SheetsBackend`] trait is the only surface the row store consumes.
//! [`GoogleSheetsClient`] speaks the Sheets v4 REST API; [`MemoryBackend`]
//! keeps the grid in process and can persist it to a JSON file.

pub mod a1;
pub mod backend;
pub mod client;
pub mod constants;
pub mod error;
pub mod memory;
pub mod models;
pub mod resilience;

pub use backend::SheetsBackend;
pub use client::{GoogleSheetsClient, SheetsAuth};
pub use error::{BackendError, BackendErrorKind};
pub use memory::MemoryBackend;
pub use models::{SheetProperties, SpreadsheetMetadata, WriteKind, WriteReceipt};
pub use resilience::{
    ConcurrencyConfig, ConcurrencyLimiter, KeyedLocks, ResilienceConfig, RetryConfig, RetryPolicy,
};
