//! Transactions producing column-addressable results.

use crate::driver::RawTransaction;
use crate::error::Result;
use crate::row::Row;
use crate::rows::Rows;
use crate::statement::Statement;
use crate::types::Value;

/// An in-progress transaction.
///
/// Dropped without [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback), the driver rolls it back.
pub struct Transaction {
    raw: Box<dyn RawTransaction>,
}

impl Transaction {
    pub(crate) fn new(raw: Box<dyn RawTransaction>) -> Self {
        Self { raw }
    }

    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        Ok(self.raw.execute(sql, params)?)
    }

    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        let raw = self.raw.query(sql, params)?;
        Ok(Rows::new(raw))
    }

    pub fn query_row(&mut self, sql: &str, params: &[Value]) -> Row {
        Row::new(self.query(sql, params))
    }

    pub fn prepare(&mut self, sql: &str) -> Result<Statement> {
        let raw = self.raw.prepare(sql)?;
        Ok(Statement::new(raw))
    }

    /// A transaction-bound copy of a statement prepared elsewhere.
    pub fn stmt(&mut self, stmt: &Statement) -> Result<Statement> {
        let raw = self.raw.stmt(stmt.raw())?;
        Ok(Statement::new(raw))
    }

    pub fn commit(mut self) -> Result<()> {
        Ok(self.raw.commit()?)
    }

    pub fn rollback(mut self) -> Result<()> {
        Ok(self.raw.rollback()?)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").finish_non_exhaustive()
    }
}
