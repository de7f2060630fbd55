//! Typed errors raised by the row store and repositories

use crate::api::BackendError;

/// Failure of a row-store or repository operation.
///
/// Mapping to transport status codes is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No row where `column` equals `value`
    NotFound {
        sheet: String,
        column: String,
        value: String,
    },
    /// The spreadsheet has no tab with this title
    SheetNotFound { sheet: String },
    /// Create would duplicate a natural key
    Conflict {
        sheet: String,
        column: String,
        value: String,
    },
    /// The request is well formed but not allowed (negative stock, header delete, bad bound)
    ValidationFailed(String),
    /// A required input was not supplied
    MissingParameter(String),
    /// A lookup referenced a column absent from the header row
    ColumnNotFound { sheet: String, column: String },
    /// The backend call failed (permission, range syntax, quota, network)
    BackendUnavailable {
        operation: &'static str,
        sheet: String,
        source: BackendError,
    },
}

impl StoreError {
    pub fn not_found(sheet: &str, column: &str, value: &str) -> Self {
        StoreError::NotFound {
            sheet: sheet.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub fn backend(operation: &'static str, sheet: &str, source: BackendError) -> Self {
        StoreError::BackendUnavailable {
            operation,
            sheet: sheet.to_string(),
            source,
        }
    }

    /// Key, column or sheet absence
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. }
                | StoreError::SheetNotFound { .. }
                | StoreError::ColumnNotFound { .. }
        )
    }

    /// Short machine-readable label
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::SheetNotFound { .. } => "sheet_not_found",
            StoreError::Conflict { .. } => "conflict",
            StoreError::ValidationFailed(_) => "validation_failed",
            StoreError::MissingParameter(_) => "missing_parameter",
            StoreError::ColumnNotFound { .. } => "column_not_found",
            StoreError::BackendUnavailable { .. } => "backend_unavailable",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { sheet, column, value } => {
                write!(f, "No row in sheet '{}' with {} = '{}'", sheet, column, value)
            }
            StoreError::SheetNotFound { sheet } => write!(f, "Sheet '{}' not found", sheet),
            StoreError::Conflict { sheet, column, value } => {
                write!(f, "A row in sheet '{}' with {} = '{}' already exists", sheet, column, value)
            }
            StoreError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            StoreError::MissingParameter(msg) => write!(f, "Missing parameter: {}", msg),
            StoreError::ColumnNotFound { sheet, column } => {
                write!(f, "Column '{}' not found in sheet '{}'", column, sheet)
            }
            StoreError::BackendUnavailable { operation, sheet, source } => {
                write!(f, "Failed to {} sheet '{}': {}", operation, sheet, source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::BackendUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_names_operation_and_sheet() {
        let err = StoreError::backend(
            "read",
            "Products",
            BackendError::permission_denied("The caller does not have permission"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to read sheet 'Products': permission denied: The caller does not have permission"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_not_found_family() {
        assert!(StoreError::not_found("Products", "Product ID", "X").is_not_found());
        assert!(StoreError::SheetNotFound { sheet: "X".into() }.is_not_found());
        assert!(!StoreError::ValidationFailed("x".into()).is_not_found());
        assert_eq!(StoreError::MissingParameter("x".into()).kind(), "missing_parameter");
    }
}
