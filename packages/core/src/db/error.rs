//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Marker SQLite puts in the message of a UNIQUE constraint failure
const UNIQUE_VIOLATION_MARKER: &str = "UNIQUE constraint failed";

/// Database operation errors
///
/// Covers connection, initialization, query and row decoding failures.
/// Business-level classification happens in the service error type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema or configuration
    #[error("Failed to initialize database: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A UNIQUE constraint rejected the write
    #[error("Unique constraint violated: {context}")]
    UniqueViolation { context: String },

    /// A stored row could not be converted into a model
    #[error("Failed to decode column '{column}': {message}")]
    RowDecode {
        column: &'static str,
        message: String,
    },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Wrap a failed statement, classifying UNIQUE violations
    pub fn statement(context: &str, source: libsql::Error) -> Self {
        let message = source.to_string();
        if message.contains(UNIQUE_VIOLATION_MARKER) {
            Self::UniqueViolation {
                context: format!("{}: {}", context, message),
            }
        } else {
            Self::SqlExecutionError {
                context: format!("{}: {}", context, message),
            }
        }
    }

    /// Create a row decode error
    pub fn row_decode(column: &'static str, message: impl ToString) -> Self {
        Self::RowDecode {
            column,
            message: message.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}
