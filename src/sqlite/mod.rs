//! Built-in SQLite driver.
//!
//! This module plugs `rusqlite` (with bundled SQLite) into the
//! [`driver`](crate::driver) traits. It is registered as `"sqlite3"` and
//! `"sqlite"` in every new [`Registry`](crate::Registry).

pub mod connection;
pub mod driver;
pub mod error;
pub mod types;


pub use connection::{SqliteConnection, SqliteRows, SqliteStatement, SqliteTransaction};
pub use driver::{SqliteDriver, SqliteOptions};
pub use error::{SqliteError, SqliteResult};
