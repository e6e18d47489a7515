//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Container or blob does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Connection string or credentials could not be turned into a client
    #[display("invalid storage configuration: {_0}")]
    Configuration(#[error(not(source))] String),
    /// Network-related error (connection resets, timeouts, throttling)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("site/index.html".to_string()).to_string(), "not found: site/index.html");
        assert_eq!(
            ErrorKind::Configuration("missing AccountName".to_string()).to_string(),
            "invalid storage configuration: missing AccountName"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Network("reset".to_string()).is_retryable());
        assert!(ErrorKind::BackendError("500".to_string()).is_retryable());
        assert!(!ErrorKind::Configuration("bad".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound("x".to_string()).is_retryable());
        assert!(!ErrorKind::PermissionDenied("x".to_string()).is_retryable());
    }
}
