//! SQLite driver and its configuration.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::connection::SqliteConnection;
use super::error::SqliteResult;
use crate::driver::{Driver, RawConnection};
use crate::error::DriverResult;

/// Options applied to every connection a [`SqliteDriver`] opens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// How long to wait on a locked database before failing, in milliseconds
    pub busy_timeout_ms: u64,
    /// Use WAL journaling with `synchronous=NORMAL` (file databases only)
    pub wal: bool,
    /// Page cache size in KiB
    pub cache_size_kib: i64,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    /// Prepared statement cache capacity
    pub statement_cache_capacity: usize,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
            wal: true,
            cache_size_kib: 64000,
            foreign_keys: false,
            statement_cache_capacity: 100,
        }
    }
}

impl SqliteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }

    pub fn cache_size_kib(mut self, kib: i64) -> Self {
        self.cache_size_kib = kib;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    pub(crate) fn apply(&self, conn: &rusqlite::Connection, is_memory: bool) -> SqliteResult<()> {
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        conn.set_prepared_statement_cache_capacity(self.statement_cache_capacity);

        let mut pragmas = format!(
            "PRAGMA cache_size=-{};\nPRAGMA foreign_keys={};",
            self.cache_size_kib.unsigned_abs(),
            if self.foreign_keys { "ON" } else { "OFF" }
        );
        // WAL only makes sense for file-based databases
        if self.wal && !is_memory {
            pragmas.push_str("\nPRAGMA journal_mode=WAL;\nPRAGMA synchronous=NORMAL;");
        }
        conn.execute_batch(&pragmas)?;

        debug!(
            busy_timeout_ms = self.busy_timeout_ms,
            wal = self.wal && !is_memory,
            cache_size_kib = self.cache_size_kib,
            foreign_keys = self.foreign_keys,
            "opened sqlite connection"
        );
        Ok(())
    }
}

/// The built-in SQLite driver.
///
/// The DSN is `:memory:` or a path / `file:` URI handed to SQLite as is.
#[derive(Debug, Clone, Default)]
pub struct SqliteDriver {
    options: SqliteOptions,
}

impl SqliteDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SqliteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }
}

impl Driver for SqliteDriver {
    fn open(&self, dsn: &str) -> DriverResult<Box<dyn RawConnection>> {
        let conn = SqliteConnection::open(dsn, &self.options)?;
        Ok(Box::new(conn))
    }
}
