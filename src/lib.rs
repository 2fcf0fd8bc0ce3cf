//! namedsql - named database connections with column-by-name row access.
//!
//! A [`Registry`] maps names to open connections so code anywhere in a
//! process can reach a database by the name it was opened under. Result
//! rows are read by column name through typed getters on [`Rows`] and
//! [`Row`] instead of positional scanning.
//!
//! ```no_run
//! use namedsql::{params, Registry};
//!
//! # fn main() -> namedsql::Result<()> {
//! let db = Registry::global().open("master", "sqlite3", ":memory:")?;
//! db.execute("CREATE TABLE people (id integer, name text)", &[])?;
//! db.execute("INSERT INTO people VALUES (?, ?)", params![1_i64, "john doe"])?;
//!
//! let mut rows = db.query("SELECT * FROM people", &[])?;
//! while rows.advance() {
//!     println!("{}: {}", rows.get_integer("id")?, rows.get_string("name")?);
//! }
//! if let Some(err) = rows.last_error() {
//!     return Err(err);
//! }
//!
//! let name = Registry::global()
//!     .get("master")
//!     .expect("opened above")
//!     .query_row("SELECT name FROM people WHERE id = ?", params![1_i64])
//!     .get_string("name")?;
//! assert_eq!(name, "john doe");
//! # Ok(())
//! # }
//! ```
//!
//! Drivers plug in through the traits in [`driver`]. SQLite (via `rusqlite`)
//! is built in under the identifiers `"sqlite3"` and `"sqlite"`.

mod connection;
pub mod driver;
mod error;
mod registry;
mod row;
mod rows;
pub mod sqlite;
mod statement;
mod transaction;
mod types;

#[cfg(test)]
mod testing;

pub use connection::Connection;
pub use driver::{Driver, RawConnection, RawRows, RawStatement, RawTransaction};
pub use error::{DriverError, DriverResult, Error, Result};
pub use registry::Registry;
pub use row::Row;
pub use rows::Rows;
pub use sqlite::{SqliteDriver, SqliteOptions};
pub use statement::Statement;
pub use transaction::Transaction;
pub use types::{FromValue, ScanTarget, Value, ValueKind};
