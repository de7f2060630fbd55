//! Sheet-backed row store
//!
//! Translates between a named sheet and header-keyed [`Record`]s: scans,
//! point lookups by column value, appends, full-row updates and positional
//! deletes.

pub mod adapter;
pub mod drift;
pub mod error;
pub mod record;
pub mod window;

pub use adapter::RowStore;
pub use drift::{ColumnDrift, MisplacedColumn};
pub use error::{StoreError, StoreResult};
pub use record::{Record, RowHandle, SheetData};
pub use window::{ListWindow, Pagination};
