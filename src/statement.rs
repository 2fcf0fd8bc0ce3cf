//! Prepared statements producing column-addressable results.

use crate::driver::RawStatement;
use crate::error::Result;
use crate::row::Row;
use crate::rows::Rows;
use crate::types::Value;

/// A prepared statement.
pub struct Statement {
    raw: Box<dyn RawStatement>,
}

impl Statement {
    pub(crate) fn new(raw: Box<dyn RawStatement>) -> Self {
        Self { raw }
    }

    pub(crate) fn raw(&self) -> &dyn RawStatement {
        self.raw.as_ref()
    }

    pub fn sql(&self) -> &str {
        self.raw.sql()
    }

    /// Execute the statement. Returns rows affected.
    pub fn execute(&mut self, params: &[Value]) -> Result<u64> {
        Ok(self.raw.execute(params)?)
    }

    pub fn query(&mut self, params: &[Value]) -> Result<Rows> {
        let raw = self.raw.query(params)?;
        Ok(Rows::new(raw))
    }

    /// Run the statement for its first row only.
    pub fn query_row(&mut self, params: &[Value]) -> Row {
        Row::new(self.query(params))
    }

    pub fn close(mut self) -> Result<()> {
        Ok(self.raw.close()?)
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.raw.sql())
            .finish_non_exhaustive()
    }
}
