// src/error.rs

//! Unified error handling for the gateway.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::BridgeError;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure category reported to callers in the `error_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownOperation,
    MalformedRequest,
    ParameterShapingError,
    OperationFailure,
    BridgeFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownOperation => "UnknownOperation",
            ErrorKind::MalformedRequest => "MalformedRequest",
            ErrorKind::ParameterShapingError => "ParameterShapingError",
            ErrorKind::OperationFailure => "OperationFailure",
            ErrorKind::BridgeFailure => "BridgeFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Operation name is not in the registry
    #[error("Unknown operation: {name}. Available operations: {}", available.join(", "))]
    UnknownOperation {
        name: String,
        available: Vec<String>,
    },

    /// Request could not be used as given
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Parameters do not fit the operation's expected shape
    #[error("Invalid parameters for {operation}: {message}")]
    ParameterShaping { operation: String, message: String },

    /// Execution bridge mechanics failed
    #[error("Execution bridge failure: {0}")]
    Bridge(String),

    /// Work unit exceeded its deadline
    #[error("Operation timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// Work unit was cancelled before completing
    #[error("Operation was cancelled")]
    Cancelled,

    /// Work unit panicked
    #[error("Operation panicked: {0}")]
    Panicked(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Upstream tool server answered with a non-success status
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Operation needs a collaborator that is not configured
    #[error("{operation} is unavailable: {reason}")]
    Unavailable { operation: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<BridgeError<AppError>> for AppError {
    fn from(error: BridgeError<AppError>) -> Self {
        match error {
            BridgeError::Work(error) => error,
            BridgeError::TimedOut(deadline) => AppError::TimedOut(deadline),
            BridgeError::Cancelled => AppError::Cancelled,
            BridgeError::Panicked(message) => AppError::Panicked(message),
            mechanical => AppError::Bridge(mechanical.to_string()),
        }
    }
}

impl AppError {
    /// Category used in response envelopes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            AppError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            AppError::ParameterShaping { .. } => ErrorKind::ParameterShapingError,
            AppError::Bridge(_) => ErrorKind::BridgeFailure,
            _ => ErrorKind::OperationFailure,
        }
    }

    /// Create a malformed-request error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest(message.into())
    }

    /// Create a parameter shaping error for an operation.
    pub fn shaping(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ParameterShaping {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create an unavailable-collaborator error.
    pub fn unavailable(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let unknown = AppError::UnknownOperation {
            name: "nope".into(),
            available: vec!["crawl_url".into()],
        };
        assert_eq!(unknown.kind(), ErrorKind::UnknownOperation);
        assert_eq!(
            AppError::malformed("empty").kind(),
            ErrorKind::MalformedRequest
        );
        assert_eq!(
            AppError::shaping("crawl_url", "missing field `url`").kind(),
            ErrorKind::ParameterShapingError
        );
        assert_eq!(
            AppError::Bridge("no thread".into()).kind(),
            ErrorKind::BridgeFailure
        );
        assert_eq!(
            AppError::TimedOut(Duration::from_millis(5)).kind(),
            ErrorKind::OperationFailure
        );
        assert_eq!(
            AppError::unavailable("search_google", "no upstream").kind(),
            ErrorKind::OperationFailure
        );
    }

    #[test]
    fn test_unknown_operation_message_lists_names() {
        let err = AppError::UnknownOperation {
            name: "fly".into(),
            available: vec!["crawl_url".into(), "batch_crawl".into()],
        };
        let message = err.to_string();
        assert!(message.starts_with("Unknown operation: fly"));
        assert!(message.contains("crawl_url, batch_crawl"));
    }

    #[test]
    fn test_error_kind_serializes_as_name() {
        let json = serde_json::to_string(&ErrorKind::ParameterShapingError).unwrap();
        assert_eq!(json, "\"ParameterShapingError\"");
    }

    #[test]
    fn test_bridge_errors_convert_by_cause() {
        let work: AppError = BridgeError::Work(AppError::malformed("bad")).into();
        assert_eq!(work.kind(), ErrorKind::MalformedRequest);

        let timed_out: AppError = BridgeError::<AppError>::TimedOut(Duration::from_secs(1)).into();
        assert!(matches!(timed_out, AppError::TimedOut(_)));
        assert_eq!(timed_out.kind(), ErrorKind::OperationFailure);

        let lost: AppError = BridgeError::<AppError>::ResultLost.into();
        assert_eq!(lost.kind(), ErrorKind::BridgeFailure);
    }
}
