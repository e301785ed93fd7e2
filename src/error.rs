// src/error.rs

//! Unified error handling for the catalog core.

use std::fmt;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite operation failed
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The catalog store cannot be reached at all
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The message source asked us to back off
    #[error("rate limited by source, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The message source rejected our credentials or permissions
    #[error("source access denied: {0}")]
    Unauthorized(String),

    /// Error while talking to the message source
    #[error("source error for {context}: {message}")]
    Source { context: String, message: String },

    /// A fetch window did not complete within its deadline
    #[error("fetch window [{from}, {to}] timed out after {attempts} attempts")]
    FetchTimeout { from: i64, to: i64, attempts: u32 },

    /// Another indexing job already holds the advisory lock
    #[error("an indexing job is already running")]
    Busy,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a source error with context.
    pub fn source(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Source {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error should abort an indexing job outright.
    ///
    /// Per-item failures keep the job alive; these do not.
    pub fn is_job_fatal(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Unauthorized(_) | Self::FetchTimeout { .. }
        )
    }
}

/// Map a SQLite error onto the transient/fatal split the crawler needs.
///
/// Connection-level failures mean the store itself is gone and the job must
/// stop; anything else is a per-record problem the caller may count and skip.
pub(crate) fn classify_sqlite(err: rusqlite::Error) -> AppError {
    use rusqlite::ErrorCode::*;

    if let rusqlite::Error::SqliteFailure(e, ref msg) = err {
        match e.code {
            CannotOpen | DatabaseBusy | DatabaseLocked | DiskFull | NotADatabase
            | DatabaseCorrupt => {
                return AppError::StoreUnavailable(msg.clone().unwrap_or_else(|| e.to_string()));
            }
            _ => {}
        }
    }
    AppError::Store(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_fatal_split() {
        assert!(AppError::StoreUnavailable("gone".into()).is_job_fatal());
        assert!(AppError::Unauthorized("revoked".into()).is_job_fatal());
        assert!(
            AppError::FetchTimeout {
                from: 1,
                to: 200,
                attempts: 3
            }
            .is_job_fatal()
        );
        assert!(
            !AppError::RateLimited {
                retry_after_secs: 5
            }
            .is_job_fatal()
        );
        assert!(!AppError::Busy.is_job_fatal());
    }

    #[test]
    fn test_classify_sqlite_connection_failure() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            Some("unable to open database file".into()),
        );
        assert!(matches!(classify_sqlite(err), AppError::StoreUnavailable(_)));
    }

    #[test]
    fn test_classify_sqlite_other() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(classify_sqlite(err), AppError::Store(_)));
    }
}
