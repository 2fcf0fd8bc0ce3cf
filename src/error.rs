//! Error types for namedsql.
//!
//! Driver failures are carried through verbatim in [`Error::Driver`]; every
//! other variant is raised by this crate's own bookkeeping.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::types::ValueKind;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Duplicate database connection name: {0}")]
    DuplicateName(String),

    #[error("No rows in result set")]
    NoRows,

    #[error("Column not found in result: {0}")]
    ColumnNotFound(String),

    #[error("Invalid column type conversion: column {column} holds {found}, requested {requested}")]
    InvalidTypeConversion {
        column: String,
        requested: &'static str,
        found: ValueKind,
    },

    #[error("Unknown driver: {0} (forgotten register_driver?)")]
    UnknownDriver(String),

    #[error("Expected {expected} scan destinations, got {got}")]
    ColumnCount { expected: usize, got: usize },

    #[error("Scan error on column index {index}: {reason}")]
    Scan { index: usize, reason: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl Error {
    /// Whether this error means "no row matched" rather than a failure.
    #[inline]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// An error produced by a database driver.
///
/// The original error is kept behind an `Arc` so it can sit in a deferred
/// slot and be handed out more than once. Use [`DriverError::downcast_ref`]
/// to get at the driver's concrete error type.
#[derive(Clone)]
pub struct DriverError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl DriverError {
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("socket hung up")]
    struct HangUp;

    #[test]
    fn test_driver_error_is_transparent() {
        let err: Error = DriverError::new(HangUp).into();
        assert_eq!(err.to_string(), "socket hung up");
    }

    #[test]
    fn test_driver_error_downcast() {
        let err = DriverError::new(HangUp);
        assert!(err.downcast_ref::<HangUp>().is_some());
        assert!(err.downcast_ref::<std::fmt::Error>().is_none());
    }

    #[test]
    fn test_no_rows_predicate() {
        assert!(Error::NoRows.is_no_rows());
        assert!(!Error::ColumnNotFound("id".to_string()).is_no_rows());
    }
}
