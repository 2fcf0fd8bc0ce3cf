//! SQLite driver error types.

use thiserror::Error;

use crate::error::DriverError;

pub type SqliteResult<T> = Result<T, SqliteError>;

/// SQLite-specific errors.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite error from rusqlite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be decoded for its declared column type
    #[error("Cannot decode column {column} ({decl_type}): {reason}")]
    Decode {
        column: String,
        decl_type: String,
        reason: String,
    },

    #[error("Expected {expected} scan targets, got {got}")]
    TargetCount { expected: usize, got: usize },

    #[error("Scan called without a current row")]
    NoCurrentRow,

    #[error("Rows are closed")]
    RowsClosed,

    #[error("Transaction has already been committed or rolled back")]
    TransactionDone,

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,
}

impl From<SqliteError> for DriverError {
    fn from(e: SqliteError) -> Self {
        DriverError::new(e)
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(e: rusqlite::Error) -> Self {
        DriverError::new(SqliteError::Sqlite(e))
    }
}
