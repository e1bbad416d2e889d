//! Error types module
//!
//! All failures in the gateway are unified under [`AppError`]. Each variant
//! self-describes how it is presented to a client through [`ErrorMetadata`]:
//! the HTTP status, a machine-readable code, and a stable numeric status that
//! uses a small custom space above the standard HTTP range for conditions
//! with no standard status code.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;
use std::time::Duration;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::constants::AUTH_FAILURE_MESSAGE;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for timeouts and upstream hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Numeric codes for conditions that have no standard HTTP status.
///
/// These travel in the `status` field of the error body; the HTTP status line
/// itself always stays in the standard range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AppStatusCode {
    Panic = 520,
    JsonEncode = 521,
    JsonDecode = 522,
    BadTokenHeader = 523,
    BadDateTime = 524,
}

impl AppStatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            520 => Some(AppStatusCode::Panic),
            521 => Some(AppStatusCode::JsonEncode),
            522 => Some(AppStatusCode::JsonDecode),
            523 => Some(AppStatusCode::BadTokenHeader),
            524 => Some(AppStatusCode::BadDateTime),
            _ => None,
        }
    }

    /// Stable text for the code.
    pub fn message(self) -> &'static str {
        match self {
            AppStatusCode::Panic => "unexpected internal failure",
            AppStatusCode::JsonEncode => "json marshall encoding to byte array",
            AppStatusCode::JsonDecode => "json unmarshall decoding",
            AppStatusCode::BadTokenHeader => AUTH_FAILURE_MESSAGE,
            AppStatusCode::BadDateTime => "bad values or wrong date time",
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Numeric status written into the error body (custom code or the HTTP status)
    fn status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "JSON_DECODE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried by the client)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("JSON decoding error: {0}")]
    JsonDecode(String),

    #[error("JSON encoding error: {0}")]
    JsonEncode(String),

    #[error("Bad date range: {0}")]
    BadDateRange(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Subprocess failed: {0}")]
    Subprocess(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        AppError::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::JsonDecode(_) => "JsonDecode",
            AppError::JsonEncode(_) => "JsonEncode",
            AppError::BadDateRange(_) => "BadDateRange",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "NotFound",
            AppError::UnsupportedMedia(_) => "UnsupportedMedia",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Timeout { .. } => "Timeout",
            AppError::Subprocess(_) => "Subprocess",
            AppError::Notification(_) => "Notification",
            AppError::Panic(_) => "Panic",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound("Record not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            AppError::JsonEncode(err.to_string())
        } else {
            AppError::JsonDecode(err.to_string())
        }
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, custom_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (u16, Option<AppStatusCode>, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, None, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, None, "INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::BadRequest(_) => (400, None, "BAD_REQUEST", false, false, LogLevel::Debug),
        AppError::JsonDecode(_) => (
            400,
            Some(AppStatusCode::JsonDecode),
            "JSON_DECODE",
            false,
            false,
            LogLevel::Debug,
        ),
        AppError::JsonEncode(_) => (
            500,
            Some(AppStatusCode::JsonEncode),
            "JSON_ENCODE",
            false,
            true,
            LogLevel::Error,
        ),
        AppError::BadDateRange(_) => (
            400,
            Some(AppStatusCode::BadDateTime),
            "BAD_DATE_RANGE",
            false,
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            Some(AppStatusCode::BadTokenHeader),
            "UNAUTHORIZED",
            false,
            true,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (404, None, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::UnsupportedMedia(_) => (
            415,
            None,
            "UNSUPPORTED_MEDIA",
            false,
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            None,
            "PAYLOAD_TOO_LARGE",
            false,
            false,
            LogLevel::Debug,
        ),
        AppError::Timeout { .. } => (504, None, "TIMEOUT", true, true, LogLevel::Warn),
        AppError::Subprocess(_) => (502, None, "SUBPROCESS_ERROR", false, true, LogLevel::Error),
        AppError::Notification(_) => (
            502,
            None,
            "NOTIFICATION_ERROR",
            true,
            true,
            LogLevel::Error,
        ),
        AppError::Panic(_) => (
            500,
            Some(AppStatusCode::Panic),
            "PANIC",
            false,
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, None, "INTERNAL_ERROR", true, true, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn status_code(&self) -> u16 {
        let (http, custom, ..) = app_error_static_metadata(self);
        custom.map(AppStatusCode::as_u16).unwrap_or(http)
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).2
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::JsonDecode(_) => AppStatusCode::JsonDecode.message().to_string(),
            AppError::JsonEncode(_) => AppStatusCode::JsonEncode.message().to_string(),
            AppError::BadDateRange(_) => AppStatusCode::BadDateTime.message().to_string(),
            // Never reveal which check failed.
            AppError::Unauthorized(_) => AUTH_FAILURE_MESSAGE.to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::UnsupportedMedia(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Timeout { .. } => "Upstream operation timed out".to_string(),
            AppError::Subprocess(_) => "Failed to process media".to_string(),
            AppError::Notification(_) => "Failed to deliver notification".to_string(),
            AppError::Panic(_) => AppStatusCode::Panic.message().to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
