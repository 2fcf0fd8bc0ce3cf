//! Single-row view over a query result.
//!
//! A [`Row`] advances its cursor at most once, the first time a column is
//! requested, and closes the cursor straight after. The decoded snapshot
//! stays in the held [`Rows`], so getters keep working afterwards.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::rows::Rows;
use crate::types::{ScanTarget, Value};

/// The first row of a query, or `NoRows`.
#[derive(Debug)]
pub struct Row {
    rows: Option<Rows>,
    err: Option<Error>,
    advanced: bool,
}

/// Closes the wrapped cursor when dropped, whichever way the scope exits.
struct CloseOnExit<'a>(&'a mut Rows);

impl Deref for CloseOnExit<'_> {
    type Target = Rows;

    fn deref(&self) -> &Rows {
        self.0
    }
}

impl DerefMut for CloseOnExit<'_> {
    fn deref_mut(&mut self) -> &mut Rows {
        self.0
    }
}

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        // Errors here only matter on the success path, which closes explicitly.
        let _ = self.0.close();
    }
}

fn advance_once(rows: &mut Rows) -> Result<()> {
    let mut guard = CloseOnExit(rows);
    if !guard.advance() {
        return Err(guard.last_error().unwrap_or(Error::NoRows));
    }
    guard.close()
}

impl Row {
    pub(crate) fn new(result: Result<Rows>) -> Self {
        match result {
            Ok(rows) => Self {
                rows: Some(rows),
                err: None,
                advanced: false,
            },
            Err(err) => Self {
                rows: None,
                err: Some(err),
                advanced: false,
            },
        }
    }

    fn fetch(&mut self) -> Result<&Rows> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let rows = self.rows.as_mut().ok_or(Error::NoRows)?;
        if !self.advanced {
            self.advanced = true;
            advance_once(rows)?;
        }
        Ok(rows)
    }

    /// Decode the row positionally into `dest`.
    ///
    /// Returns [`Error::NoRows`] when the query matched nothing.
    pub fn scan_into(&mut self, dest: &mut [&mut dyn ScanTarget]) -> Result<()> {
        self.fetch()?.scan(dest)
    }

    pub fn columns(&mut self) -> Result<&[String]> {
        Ok(self.fetch()?.columns().unwrap_or_default())
    }

    pub fn get_value(&mut self, column: &str) -> Result<&Value> {
        self.fetch()?.get_value(column)
    }

    pub fn is_null(&mut self, column: &str) -> Result<bool> {
        self.fetch()?.is_null(column)
    }

    /// Get the boolean value in this row by column name.
    pub fn get_boolean(&mut self, column: &str) -> Result<bool> {
        self.fetch()?.get_boolean(column)
    }

    /// Get the integer value in this row by column name.
    pub fn get_integer(&mut self, column: &str) -> Result<i64> {
        self.fetch()?.get_integer(column)
    }

    /// Get the float value in this row by column name.
    pub fn get_double(&mut self, column: &str) -> Result<f64> {
        self.fetch()?.get_double(column)
    }

    /// Get the string value in this row by column name.
    pub fn get_string(&mut self, column: &str) -> Result<String> {
        self.fetch()?.get_string(column)
    }

    /// Get the timestamp value in this row by column name.
    pub fn get_timestamp(&mut self, column: &str) -> Result<DateTime<Utc>> {
        self.fetch()?.get_timestamp(column)
    }

    pub fn get_bytes(&mut self, column: &str) -> Result<Vec<u8>> {
        self.fetch()?.get_bytes(column)
    }
}
