//! Error types for background scan operations.
//!
//! Every internal step returns `Result<T, ErrorRecord>`. The first failing
//! step short-circuits the call through `?`, so the record that reaches
//! [`ErrorReporter::report`] is always the first failure of that call.
//! [`ClientError`] is the single caller-facing error type.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::store::{StoreError, STORE_CODE_REQUEST_INVALID};

/// Result code for a malformed or rejected parameter.
pub const RESULT_CODE_PARAM: i32 = -2;

/// Result code for a generic client-side failure.
pub const RESULT_CODE_CLIENT: i32 = -1;

/// Result code for a request the store considers structurally invalid.
pub const RESULT_CODE_REQUEST_INVALID: i32 = 4;

/// Classification of a failure.
///
/// # Examples
///
/// ```
/// use scan_jobs::ErrorCode;
///
/// assert_eq!(ErrorCode::InvalidParam.result_code(), -2);
/// assert_eq!(ErrorCode::Store(9).result_code(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed or missing caller input, detected before any store call.
    InvalidParam,
    /// Policy or option shape rejected.
    Validation,
    /// UDF argument sequence could not be converted.
    Conversion,
    /// The request was rejected as structurally invalid.
    Protocol,
    /// The store returned a non-success result code.
    Store(i32),
}

impl ErrorCode {
    /// Numeric result code surfaced to callers.
    ///
    /// Store codes pass through verbatim.
    pub fn result_code(&self) -> i32 {
        match self {
            Self::InvalidParam | Self::Validation => RESULT_CODE_PARAM,
            Self::Conversion => RESULT_CODE_CLIENT,
            Self::Protocol => RESULT_CODE_REQUEST_INVALID,
            Self::Store(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParam => write!(f, "invalid_param"),
            Self::Validation => write!(f, "validation"),
            Self::Conversion => write!(f, "conversion"),
            Self::Protocol => write!(f, "protocol"),
            Self::Store(code) => write!(f, "store({code})"),
        }
    }
}

/// A failure recorded at the first point it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// What kind of failure this is.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl ErrorRecord {
    /// Creates a record with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for an [`ErrorCode::InvalidParam`] record.
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParam, message)
    }

    /// Shorthand for an [`ErrorCode::Validation`] record.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Shorthand for an [`ErrorCode::Conversion`] record.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conversion, message)
    }
}

impl From<StoreError> for ErrorRecord {
    /// A structural rejection by the store becomes [`ErrorCode::Protocol`];
    /// every other store result keeps its code.
    fn from(err: StoreError) -> Self {
        let code = if err.code == STORE_CODE_REQUEST_INVALID {
            ErrorCode::Protocol
        } else {
            ErrorCode::Store(err.code)
        };
        Self::new(code, err.message)
    }
}

/// Caller-facing error returned by [`Client`](crate::Client) operations.
///
/// Carries the original code and message of the failure without
/// coercion.
///
/// # Examples
///
/// ```
/// use scan_jobs::{ErrorCode, ErrorRecord, ErrorReporter};
///
/// let err = ErrorReporter::report(ErrorRecord::invalid_param("invalid client object"));
/// assert_eq!(err.code, ErrorCode::InvalidParam);
/// assert_eq!(err.result_code, -2);
/// assert_eq!(err.message, "invalid client object");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message} (code {result_code})")]
pub struct ClientError {
    /// Failure classification.
    pub code: ErrorCode,
    /// Numeric result code, see [`ErrorCode::result_code`].
    pub result_code: i32,
    /// Message of the original failure.
    pub message: String,
}

impl ClientError {
    /// Returns `true` if the failure was detected before any store call.
    pub fn is_client_side(&self) -> bool {
        !matches!(self.code, ErrorCode::Store(_) | ErrorCode::Protocol)
    }
}

/// Converts internal error records into [`ClientError`]s.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Builds the caller-facing error, preserving code and message.
    pub fn report(record: ErrorRecord) -> ClientError {
        ClientError {
            result_code: record.code.result_code(),
            code: record.code,
            message: record.message,
        }
    }
}

impl From<ErrorRecord> for ClientError {
    fn from(record: ErrorRecord) -> Self {
        ErrorReporter::report(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_preserves_code_and_message() {
        let err = ErrorReporter::report(ErrorRecord::validation("unknown policy key: foo"));
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.result_code, RESULT_CODE_PARAM);
        assert_eq!(err.message, "unknown policy key: foo");
        assert!(err.is_client_side());
    }

    #[test]
    fn store_error_maps_verbatim() {
        let record: ErrorRecord = StoreError::new(9, "timeout").into();
        assert_eq!(record.code, ErrorCode::Store(9));
        let err = ErrorReporter::report(record);
        assert_eq!(err.result_code, 9);
        assert_eq!(err.message, "timeout");
        assert!(!err.is_client_side());
    }

    #[test]
    fn request_invalid_is_protocol() {
        let record: ErrorRecord = StoreError::request_invalid("no UDF attached").into();
        assert_eq!(record.code, ErrorCode::Protocol);
        let err = ErrorReporter::report(record);
        assert_eq!(err.result_code, 4);
        assert_eq!(err.message, "no UDF attached");
    }

    #[test]
    fn result_codes() {
        assert_eq!(ErrorCode::InvalidParam.result_code(), -2);
        assert_eq!(ErrorCode::Validation.result_code(), -2);
        assert_eq!(ErrorCode::Conversion.result_code(), -1);
        assert_eq!(ErrorCode::Protocol.result_code(), 4);
        assert_eq!(ErrorCode::Store(2).result_code(), 2);
    }

    #[test]
    fn display_includes_result_code() {
        let err = ErrorReporter::report(ErrorRecord::conversion("integer out of range"));
        assert_eq!(err.to_string(), "integer out of range (code -1)");
        assert_eq!(ErrorCode::Store(2).to_string(), "store(2)");
    }

    #[test]
    fn serializes_for_bindings() {
        let err = ErrorReporter::report(ErrorRecord::invalid_param("bad"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "invalid_param");
        assert_eq!(json["result_code"], -2);
        assert_eq!(json["message"], "bad");
    }
}
