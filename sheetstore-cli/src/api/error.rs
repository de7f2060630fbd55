//! Errors reported by a spreadsheet backend

use super::resilience::RetryableError;

/// Classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Credentials rejected or the caller lacks access to the spreadsheet
    PermissionDenied,
    /// The A1 range could not be parsed or does not exist
    InvalidRange,
    /// Spreadsheet (or addressed resource) does not exist
    NotFound,
    /// Quota exhausted (HTTP 429 / RESOURCE_EXHAUSTED)
    RateLimited,
    /// Network failure, timeout or 5xx response
    Transient,
    /// Backend answered with something we could not decode
    Malformed,
    /// Anything else
    Other,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BackendErrorKind::PermissionDenied => "permission denied",
            BackendErrorKind::InvalidRange => "invalid range",
            BackendErrorKind::NotFound => "not found",
            BackendErrorKind::RateLimited => "rate limited",
            BackendErrorKind::Transient => "transient failure",
            BackendErrorKind::Malformed => "malformed response",
            BackendErrorKind::Other => "backend error",
        };
        write!(f, "{}", label)
    }
}

/// A failure returned by a [`SheetsBackend`](super::SheetsBackend) call
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    /// HTTP status when the failure came from a response
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::PermissionDenied, message)
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRange, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::RateLimited, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transient, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Malformed, message)
    }

    /// Classify an HTTP status code the way the Sheets API uses them
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            400 => BackendErrorKind::InvalidRange,
            401 | 403 => BackendErrorKind::PermissionDenied,
            404 => BackendErrorKind::NotFound,
            429 => BackendErrorKind::RateLimited,
            408 => BackendErrorKind::Transient,
            500..=599 => BackendErrorKind::Transient,
            _ => BackendErrorKind::Other,
        };
        Self::new(kind, message).with_status(status)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {}): {}", self.kind, status, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for BackendError {}

impl RetryableError for BackendError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            BackendErrorKind::RateLimited | BackendErrorKind::Transient
        )
    }

    /// Quota rejections are refused before anything is written
    fn was_rejected(&self) -> bool {
        self.kind == BackendErrorKind::RateLimited
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return BackendError::transient(err.to_string());
        }
        if err.is_decode() {
            return BackendError::malformed(err.to_string());
        }
        match err.status() {
            Some(status) => BackendError::from_status(status.as_u16(), err.to_string()),
            None => BackendError::new(BackendErrorKind::Other, err.to_string()),
        }
    }
}
