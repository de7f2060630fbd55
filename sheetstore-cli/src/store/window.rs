//! Read windows: page/limit pagination and explicit ranges

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Range read when a caller asks for "everything" explicitly
pub const DEFAULT_RANGE: &str = "A1:Z1000";

/// Page/limit pair, clamped to `page >= 1` and `1 <= limit <= 1000`.
///
/// This is a blind window: it never learns how many rows exist, so a page past
/// the end of the data simply comes back short or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    /// First sheet row of the window (row 1 is the header)
    pub fn first_row(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64 + 2
    }

    /// Last sheet row of the window, inclusive
    pub fn last_row(&self) -> u64 {
        self.first_row() + self.limit as u64 - 1
    }

    /// Number of data rows preceding this page
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// How a list operation picks its rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListWindow {
    /// Derived from page/limit
    Page(Pagination),
    /// Caller-supplied cell range such as `A1:Z50`; its first row is read as the header
    Range(String),
}

impl Default for ListWindow {
    fn default() -> Self {
        ListWindow::Page(Pagination::default())
    }
}

impl ListWindow {
    /// Explicit range wins over pagination
    pub fn from_parts(range: Option<String>, page: Option<u32>, limit: Option<u32>) -> Self {
        match range.filter(|r| !r.trim().is_empty()) {
            Some(r) => ListWindow::Range(r),
            None => ListWindow::Page(Pagination::new(page, limit)),
        }
    }
}
