//! Sheet-backed row store for retail records.
//!
//! Rows live in spreadsheet tabs whose first row is the header. The `store`
//! layer reads and writes raw rows through a [`api::SheetsBackend`]; the
//! `repository` layer adds per-entity keys, defaults and numeric adjustments;
//! `query` filters and summarizes scanned rows.

pub mod api;
pub mod cli;
pub mod config;
pub mod query;
pub mod repository;
pub mod store;
