//! Named connection handle.
//!
//! [`Connection`] decorates a driver connection: its queries come back as
//! [`Rows`]/[`Row`] with column-by-name access, and closing it removes it
//! from the registry it was opened through.

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::driver::RawConnection;
use crate::error::Result;
use crate::registry::RegistryInner;
use crate::row::Row;
use crate::rows::Rows;
use crate::statement::Statement;
use crate::transaction::Transaction;
use crate::types::Value;

/// An open database connection held in a [`Registry`](crate::Registry).
pub struct Connection {
    raw: Box<dyn RawConnection>,
    registry: Weak<RegistryInner>,
}

impl Connection {
    pub(crate) fn new(raw: Box<dyn RawConnection>, registry: Weak<RegistryInner>) -> Self {
        Self { raw, registry }
    }

    pub(crate) fn raw(&self) -> &dyn RawConnection {
        self.raw.as_ref()
    }

    /// Close this connection and remove it from its registry.
    ///
    /// If the driver fails to close, the error is returned and the entry
    /// stays registered. A second call is passed to the driver as is.
    pub fn close(&self) -> Result<()> {
        let Some(registry) = self.registry.upgrade() else {
            return Ok(self.raw.close()?);
        };
        let mut connections = registry.connections.write();
        self.raw.close()?;

        let name = connections
            .iter()
            .find(|(_, conn)| std::ptr::eq(Arc::as_ptr(conn), self))
            .map(|(name, _)| name.clone());
        if let Some(name) = name {
            connections.remove(&name);
            debug!(connection = %name, "closed database connection");
        }
        Ok(())
    }

    /// Execute a statement that doesn't return rows. Returns rows affected.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        Ok(self.raw.execute(sql, params)?)
    }

    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        let raw = self.raw.query(sql, params)?;
        Ok(Rows::new(raw))
    }

    /// Run a query for its first row only.
    ///
    /// Query errors are deferred until the row is read.
    pub fn query_row(&self, sql: &str, params: &[Value]) -> Row {
        Row::new(self.query(sql, params))
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        let raw = self.raw.prepare(sql)?;
        Ok(Statement::new(raw))
    }

    pub fn begin(&self) -> Result<Transaction> {
        let raw = self.raw.begin()?;
        Ok(Transaction::new(raw))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
