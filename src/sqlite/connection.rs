//! SQLite connection implementation.
//!
//! One `rusqlite::Connection` sits behind a mutex shared by the connection,
//! its prepared statements and its transactions. Query results are read
//! into memory while the lock is held, since rusqlite's `Rows` borrow the
//! statement; a stepping error is kept and reported once the rows read
//! before it have been consumed.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use tracing::warn;

use super::driver::SqliteOptions;
use super::error::{SqliteError, SqliteResult};
use super::types::{decode, DeclaredType};
use crate::driver::{RawConnection, RawRows, RawStatement, RawTransaction};
use crate::error::{DriverError, DriverResult};
use crate::types::Value;

type Shared = Arc<Mutex<Option<rusqlite::Connection>>>;

fn with_conn<T>(
    shared: &Shared,
    f: impl FnOnce(&rusqlite::Connection) -> SqliteResult<T>,
) -> SqliteResult<T> {
    let guard = shared.lock();
    let conn = guard.as_ref().ok_or(SqliteError::ConnectionClosed)?;
    f(conn)
}

fn execute(shared: &Shared, sql: &str, params: &[Value]) -> DriverResult<u64> {
    let changed = with_conn(shared, |conn| {
        let mut stmt = conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params))?)
    })?;
    Ok(changed as u64)
}

fn query(shared: &Shared, sql: &str, params: &[Value]) -> DriverResult<Box<dyn RawRows>> {
    let rows = with_conn(shared, |conn| SqliteRows::read(conn, sql, params))?;
    Ok(Box::new(rows))
}

fn prepare(shared: &Shared, sql: &str) -> DriverResult<Box<dyn RawStatement>> {
    // Compile once so syntax errors surface here; the cache keeps it warm.
    with_conn(shared, |conn| {
        conn.prepare_cached(sql)?;
        Ok(())
    })?;
    Ok(Box::new(SqliteStatement {
        conn: Arc::clone(shared),
        sql: sql.to_string(),
    }))
}

/// A SQLite connection.
pub struct SqliteConnection {
    conn: Shared,
}

impl SqliteConnection {
    /// Open a SQLite database.
    ///
    /// Supports:
    /// - `:memory:` (or an empty string) for an in-memory database
    /// - A file path or `file:` URI for a disk-based database
    ///
    /// File-based databases get WAL journaling when enabled in `options`.
    pub fn open(dsn: &str, options: &SqliteOptions) -> SqliteResult<Self> {
        let is_memory = dsn.is_empty() || dsn == ":memory:";
        let conn = if is_memory {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(dsn)?
        };
        options.apply(&conn, is_memory)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

impl RawConnection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> DriverResult<u64> {
        execute(&self.conn, sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> DriverResult<Box<dyn RawRows>> {
        query(&self.conn, sql, params)
    }

    fn prepare(&self, sql: &str) -> DriverResult<Box<dyn RawStatement>> {
        prepare(&self.conn, sql)
    }

    fn begin(&self) -> DriverResult<Box<dyn RawTransaction>> {
        with_conn(&self.conn, |conn| Ok(conn.execute_batch("BEGIN")?))?;
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            done: false,
        }))
    }

    /// Closing twice is a no-op. If SQLite refuses to close, the connection
    /// is kept so the close can be retried.
    fn close(&self) -> DriverResult<()> {
        let mut guard = self.conn.lock();
        let Some(conn) = guard.take() else {
            return Ok(());
        };
        if let Err((conn, e)) = conn.close() {
            *guard = Some(conn);
            return Err(e.into());
        }
        Ok(())
    }
}

/// A result set read from a SQLite statement.
pub struct SqliteRows {
    columns: Vec<String>,
    decl_types: Vec<DeclaredType>,
    pending: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    deferred: Option<DriverError>,
    err: Option<DriverError>,
    closed: bool,
}

impl SqliteRows {
    fn read(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> SqliteResult<Self> {
        let mut stmt = conn.prepare_cached(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let decl_types: Vec<DeclaredType> = stmt
            .columns()
            .iter()
            .map(|c| DeclaredType::from_decl(c.decl_type()))
            .collect();

        let mut pending = VecDeque::new();
        let mut deferred = None;
        let mut rows = stmt.query(params_from_iter(params))?;
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut values = Vec::with_capacity(columns.len());
                    for i in 0..columns.len() {
                        values.push(SqlValue::from(row.get_ref(i)?));
                    }
                    pending.push_back(values);
                }
                Ok(None) => break,
                Err(e) => {
                    deferred = Some(DriverError::from(e));
                    break;
                }
            }
        }

        Ok(Self {
            columns,
            decl_types,
            pending,
            current: None,
            deferred,
            err: None,
            closed: false,
        })
    }
}

impl RawRows for SqliteRows {
    fn advance(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.current = self.pending.pop_front();
        if self.current.is_none() {
            if let Some(e) = self.deferred.take() {
                self.err = Some(e);
            }
            return false;
        }
        true
    }

    fn columns(&self) -> DriverResult<Vec<String>> {
        if self.closed {
            return Err(SqliteError::RowsClosed.into());
        }
        Ok(self.columns.clone())
    }

    fn scan(&mut self, targets: &mut [Value]) -> DriverResult<()> {
        let row = self.current.as_ref().ok_or(SqliteError::NoCurrentRow)?;
        if targets.len() != row.len() {
            return Err(SqliteError::TargetCount {
                expected: row.len(),
                got: targets.len(),
            }
            .into());
        }
        for (i, (target, raw)) in targets.iter_mut().zip(row.iter()).enumerate() {
            *target = decode(&self.columns[i], self.decl_types[i], raw)?;
        }
        Ok(())
    }

    fn error(&self) -> Option<DriverError> {
        self.err.clone()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}

/// A prepared SQLite statement.
///
/// Holds the SQL text and relies on the connection's statement cache, so it
/// never borrows the connection.
pub struct SqliteStatement {
    conn: Shared,
    sql: String,
}

impl RawStatement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute(&mut self, params: &[Value]) -> DriverResult<u64> {
        execute(&self.conn, &self.sql, params)
    }

    fn query(&mut self, params: &[Value]) -> DriverResult<Box<dyn RawRows>> {
        query(&self.conn, &self.sql, params)
    }

    fn close(&mut self) -> DriverResult<()> {
        Ok(())
    }
}

/// A SQLite transaction driven by `BEGIN`/`COMMIT`/`ROLLBACK`.
pub struct SqliteTransaction {
    conn: Shared,
    done: bool,
}

impl SqliteTransaction {
    fn check(&self) -> DriverResult<()> {
        if self.done {
            return Err(SqliteError::TransactionDone.into());
        }
        Ok(())
    }

    /// Only marks the transaction done once `sql` succeeded, so a failed
    /// `COMMIT` is still rolled back on drop.
    fn finish(&mut self, sql: &str) -> DriverResult<()> {
        self.check()?;
        with_conn(&self.conn, |conn| Ok(conn.execute_batch(sql)?))?;
        self.done = true;
        Ok(())
    }
}

impl RawTransaction for SqliteTransaction {
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<u64> {
        self.check()?;
        execute(&self.conn, sql, params)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> DriverResult<Box<dyn RawRows>> {
        self.check()?;
        query(&self.conn, sql, params)
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn RawStatement>> {
        self.check()?;
        prepare(&self.conn, sql)
    }

    fn stmt(&mut self, stmt: &dyn RawStatement) -> DriverResult<Box<dyn RawStatement>> {
        self.check()?;
        prepare(&self.conn, stmt.sql())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let result = with_conn(&self.conn, |conn| {
            // SQLite may already have ended the transaction on its own
            if conn.is_autocommit() {
                return Ok(());
            }
            warn!("transaction not committed or rolled back; rolling back");
            Ok(conn.execute_batch("ROLLBACK")?)
        });
        if let Err(e) = result {
            warn!(error = %e, "rollback on drop failed");
        }
    }
}
