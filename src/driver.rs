//! Capability traits a database driver implements.
//!
//! These are the only seams between namedsql and a concrete client library.
//! The decorated types in this crate ([`Connection`](crate::Connection),
//! [`Rows`](crate::Rows), ...) call through these traits and add naming and
//! column-by-name bookkeeping on top.
//!
//! Conventions follow the usual SQL client contract:
//! - [`RawRows::advance`] returning `false` with [`RawRows::error`] unset is
//!   a clean end of stream, not a failure.
//! - A failed call returns its error and produces nothing else.

use crate::error::{DriverError, DriverResult};
use crate::types::Value;

/// Opens raw connections from an opaque data source name.
pub trait Driver: Send + Sync {
    fn open(&self, dsn: &str) -> DriverResult<Box<dyn RawConnection>>;
}

/// An open database connection as provided by a driver.
pub trait RawConnection: Send + Sync {
    /// Execute a statement that doesn't return rows. Returns rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> DriverResult<u64>;

    /// Run a query and return a cursor over its result set.
    fn query(&self, sql: &str, params: &[Value]) -> DriverResult<Box<dyn RawRows>>;

    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn RawStatement>>;

    fn begin(&self) -> DriverResult<Box<dyn RawTransaction>>;

    /// Close the connection. Calling this twice is driver-defined.
    fn close(&self) -> DriverResult<()>;
}

/// A prepared statement.
pub trait RawStatement: Send {
    /// The SQL text this statement was prepared from.
    fn sql(&self) -> &str;

    fn execute(&mut self, params: &[Value]) -> DriverResult<u64>;

    fn query(&mut self, params: &[Value]) -> DriverResult<Box<dyn RawRows>>;

    fn close(&mut self) -> DriverResult<()>;
}

/// An in-progress transaction.
///
/// Drivers should roll back on drop when neither `commit` nor `rollback`
/// has been called.
pub trait RawTransaction: Send {
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<u64>;

    fn query(&mut self, sql: &str, params: &[Value]) -> DriverResult<Box<dyn RawRows>>;

    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn RawStatement>>;

    /// Rebind an existing statement so it runs inside this transaction.
    fn stmt(&mut self, stmt: &dyn RawStatement) -> DriverResult<Box<dyn RawStatement>>;

    fn commit(&mut self) -> DriverResult<()>;

    fn rollback(&mut self) -> DriverResult<()>;
}

/// A streaming cursor over a result set.
pub trait RawRows: Send {
    /// Move to the next row. Returns `false` at the end of the stream or on
    /// error; check [`RawRows::error`] to tell them apart.
    fn advance(&mut self) -> bool;

    /// Result column names, in positional order.
    fn columns(&self) -> DriverResult<Vec<String>>;

    /// Decode the current row into `targets`, one slot per column.
    fn scan(&mut self, targets: &mut [Value]) -> DriverResult<()>;

    /// The error that ended iteration, if any.
    fn error(&self) -> Option<DriverError>;

    fn close(&mut self) -> DriverResult<()>;
}
