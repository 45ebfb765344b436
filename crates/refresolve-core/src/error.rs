//! Error types for reference resolution.
//!
//! Every failure a caller can observe maps onto one of five categories:
//! invalid format, not found, timeout, network error, or unknown. The enum
//! is `Clone` because a single in-flight lookup outcome is handed to every
//! caller that coalesced onto it.

use crate::reference::ResourceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Main error type for the resolver.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    // Input errors
    #[error("Invalid reference format '{input}': {reason}")]
    InvalidFormat { input: String, reason: String },

    #[error("Invalid parameter: {message}")]
    InvalidParams { message: String },

    // Lookup errors
    #[error("{kind} reference not found: {reference}")]
    NotFound {
        kind: ResourceKind,
        reference: String,
    },

    #[error("Reference not found as a listing or a developer unit: {reference}")]
    NotFoundInEither { reference: String },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {message}")]
    Network {
        message: String,
        /// HTTP status when the failure came from a response.
        status_code: Option<u16>,
    },

    #[error("Malformed lookup record: {message}")]
    InvalidRecord { message: String },

    #[error("Resolution cancelled")]
    Cancelled,

    // Storage errors
    #[error("Session store error: {message}")]
    Storage { message: String },

    #[error("JSON error: {message}")]
    Json { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{message}")]
    Unknown { message: String },
}

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidFormat,
    NotFound,
    Timeout,
    NetworkError,
    Unknown,
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::Json {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ResolveError {
    fn from(err: rusqlite::Error) -> Self {
        ResolveError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ResolveError::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            ResolveError::InvalidRecord {
                message: err.to_string(),
            }
        } else {
            ResolveError::Network {
                message: err.to_string(),
                status_code: err.status().map(|s| s.as_u16()),
            }
        }
    }
}

impl From<crate::cancel::CancelledError> for ResolveError {
    fn from(_: crate::cancel::CancelledError) -> Self {
        ResolveError::Cancelled
    }
}

impl ResolveError {
    /// Create an invalid-format error.
    pub fn invalid_format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolveError::InvalidFormat {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Map onto the caller-facing failure taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ResolveError::InvalidFormat { .. } | ResolveError::InvalidParams { .. } => {
                ErrorCategory::InvalidFormat
            }
            ResolveError::NotFound { .. } | ResolveError::NotFoundInEither { .. } => {
                ErrorCategory::NotFound
            }
            ResolveError::Timeout(_) | ResolveError::Cancelled => ErrorCategory::Timeout,
            ResolveError::Network { .. } => ErrorCategory::NetworkError,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Not-found is terminal, and so is anything unclassified.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Network { .. } | ResolveError::Timeout(_))
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32000: Network/connectivity error or timeout
    /// - -32002: Reference not found
    /// - -32005: Validation error
    /// - -32603: Internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Timeout | ErrorCategory::NetworkError => -32000,
            ErrorCategory::NotFound => -32002,
            ErrorCategory::InvalidFormat => -32005,
            ErrorCategory::Unknown => -32603,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolveError::NotFound {
            kind: ResourceKind::Unit,
            reference: "102".into(),
        };
        assert_eq!(err.to_string(), "unit reference not found: 102");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ResolveError::invalid_format("!!!", "empty").category(),
            ErrorCategory::InvalidFormat
        );
        assert_eq!(
            ResolveError::NotFoundInEither {
                reference: "1".into()
            }
            .category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ResolveError::InvalidRecord {
                message: "no id".into()
            }
            .category(),
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ResolveError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(ResolveError::Network {
            message: "reset".into(),
            status_code: Some(502)
        }
        .is_retryable());
        assert!(!ResolveError::NotFound {
            kind: ResourceKind::Property,
            reference: "203456".into()
        }
        .is_retryable());
        assert!(!ResolveError::Unknown {
            message: "teapot".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(ResolveError::Cancelled.to_rpc_error_code(), -32000);
        assert_eq!(
            ResolveError::invalid_format("x", "y").to_rpc_error_code(),
            -32005
        );
    }
}
