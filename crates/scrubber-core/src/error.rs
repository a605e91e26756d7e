//! Error types module
//!
//! Application-level errors shared by the Scrubber binaries. Library crates
//! define their own `thiserror` enums (`StorageError`, `ProcessingError`) and
//! convert into [`AppError`] at the edge.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like bad input
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be reported to the operator.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the operator
    fn suggested_action(&self) -> Option<&'static str>;

    /// Process exit code for command-line callers
    fn exit_code(&self) -> i32;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
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
        match err.kind() {
            io::ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            _ => AppError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, exit_code, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, i32, LogLevel) {
    match err {
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check command arguments and try again"),
            2,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the file or key exists"),
            2,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size or raise MAX_FILE_SIZE_MB"),
            2,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            1,
            LogLevel::Warn,
        ),
        AppError::Processing(_) => (
            "PROCESSING_ERROR",
            false,
            Some("Abort this upload; do not retry automatically"),
            1,
            LogLevel::Error,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check environment variables and .env file"),
            78,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            1,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn exit_code(&self) -> i32 {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_processing() {
        let err = AppError::Processing("entropy source unavailable".to_string());
        assert_eq!(err.error_code(), "PROCESSING_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(err.to_string().contains("entropy source unavailable"));
    }

    #[test]
    fn test_error_metadata_payload_too_large() {
        let err = AppError::PayloadTooLarge {
            size: 2000,
            max: 1000,
        };
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert!(err.to_string().contains("2000"));
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_error_metadata_storage_is_recoverable_warning() {
        let err = AppError::Storage("disk full".to_string());
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = AppError::from(io::Error::new(io::ErrorKind::NotFound, "missing.jpg"));
        assert!(matches!(err, AppError::NotFound(_)));

        let err = AppError::from(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        assert_eq!(
            AppError::Storage("x".to_string()).suggested_action(),
            Some("Retry after a short delay")
        );
        assert_eq!(AppError::Config("x".to_string()).exit_code(), 78);
        let err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert!(err.is_recoverable());
    }
}
