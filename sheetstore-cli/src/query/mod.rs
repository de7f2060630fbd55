//! Query and filter evaluation over scanned records
//!
//! Everything here is pure: filters and summaries take records from a full
//! scan and return new values without touching the sheet.

pub mod coerce;
pub mod filters;
pub mod params;
pub mod summary;

pub use filters::{FilterSet, Predicate, filter};
pub use params::{
    BatchQuery, OrderDetailQuery, OrderQuery, ProductQuery, QueryParams, TransactionQuery,
    filter_set_for,
};
pub use summary::{
    DateWindow, InventorySummary, ProductBatchSummary, TransactionSummary, inventory_summary,
    product_batch_summary, transaction_summary,
};
