//! Error types for the worker pool and the scan coordinator.
//!
//! Errors are split by who can observe them:
//!
//! 1. **Pool errors** ([`PoolError`]) come out of [`crate::pool::ThreadPool`]: a
//!    rejected construction, a submission after shutdown, or a task outcome that
//!    carries a captured panic instead of a value.
//! 2. **Scan errors** ([`ScanError`]) come out of the coordinator: invalid input,
//!    a failed directory walk, or an output file that could not be written.
//!
//! A file that cannot be opened during a scan is not an error at all; it is
//! skipped and left out of every statistic.
//!
//! ```rust,ignore
//! match poolgrep::search(&config) {
//!     Ok(report) if report.output_failures.is_empty() => // all good,
//!     Ok(report) => // scan succeeded, some output could not be written,
//!     Err(ScanError::RootNotFound(path)) => // nothing was scanned,
//!     Err(e) => // other fatal error
//! }
//! ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors raised by the worker pool or carried by a task handle
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid thread count: {0} (must be at least 1)")]
    InvalidThreadCount(usize),
    #[error("Submit on inactive pool")]
    Inactive,
    #[error("Task panicked: {0}")]
    TaskPanicked(String),
    #[error("Task was dropped before it produced a result")]
    TaskAbandoned,
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors that can occur during a scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Root directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] ignore::Error),
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ScanError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RootNotFound(path.into())
    }

    pub fn output_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let err = ScanError::invalid_pattern("empty");
        assert!(matches!(err, ScanError::InvalidPattern(_)));

        let err = ScanError::root_not_found("missing");
        assert!(matches!(err, ScanError::RootNotFound(_)));

        let err = ScanError::output_write("out.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ScanError::OutputWrite { .. }));

        let err: ScanError = PoolError::Inactive.into();
        assert!(matches!(err, ScanError::Pool(PoolError::Inactive)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PoolError::InvalidThreadCount(0).to_string(),
            "Invalid thread count: 0 (must be at least 1)"
        );
        assert_eq!(PoolError::Inactive.to_string(), "Submit on inactive pool");
        assert_eq!(
            PoolError::TaskPanicked("boom".to_string()).to_string(),
            "Task panicked: boom"
        );

        let err = ScanError::config_error("Missing required field");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = ScanError::root_not_found("nowhere");
        assert_eq!(err.to_string(), "Root directory not found: nowhere");

        let err: ScanError = PoolError::Inactive.into();
        assert_eq!(
            err.to_string(),
            "Worker pool error: Submit on inactive pool"
        );
    }
}
