//! Buffered row cursor with column-by-name access.
//!
//! [`Rows`] wraps a driver cursor. Each successful [`Rows::advance`] decodes
//! every column of the new row and republishes it into a name-keyed
//! snapshot, so typed getters can look values up by column name. The
//! snapshot survives [`Rows::close`], which is what lets a single-row view
//! keep answering getters after its cursor is released.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use smallvec::SmallVec;

use crate::driver::RawRows;
use crate::error::{Error, Result};
use crate::types::{ScanTarget, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Fresh,
    Positioned,
    Exhausted,
    Failed,
}

/// A cursor over a query's result set.
///
/// Not safe for concurrent use; advancing requires `&mut self`.
pub struct Rows {
    raw: Box<dyn RawRows>,
    state: CursorState,
    err: Option<Error>,
    closed: bool,
    /// Column names, fetched once on the first successful advance.
    columns: Option<Vec<String>>,
    /// Decode targets, one per column, sized once and reused for every row.
    targets: SmallVec<[Value; 16]>,
    /// Name-keyed snapshot of the current row.
    values: Option<HashMap<String, Value>>,
}

impl Rows {
    pub(crate) fn new(raw: Box<dyn RawRows>) -> Self {
        Self {
            raw,
            state: CursorState::Fresh,
            err: None,
            closed: false,
            columns: None,
            targets: SmallVec::new(),
            values: None,
        }
    }

    /// Move to the next row, decoding it into the snapshot.
    ///
    /// Returns `false` once the result set is exhausted or an error occurs;
    /// check [`Rows::last_error`] to tell the two apart. Once `false` has
    /// been returned, further calls keep returning `false` without touching
    /// the driver.
    pub fn advance(&mut self) -> bool {
        match self.state {
            CursorState::Exhausted | CursorState::Failed => return false,
            CursorState::Fresh | CursorState::Positioned => {}
        }
        if self.closed {
            return false;
        }

        if !self.raw.advance() {
            self.state = if self.raw.error().is_some() {
                CursorState::Failed
            } else {
                CursorState::Exhausted
            };
            self.values = None;
            return false;
        }

        if self.columns.is_none() {
            match self.raw.columns() {
                Ok(columns) => {
                    self.targets = columns.iter().map(|_| Value::Null).collect();
                    self.values = Some(HashMap::with_capacity(columns.len()));
                    self.columns = Some(columns);
                }
                Err(e) => return self.fail(e.into()),
            }
        }

        if let Err(e) = self.raw.scan(&mut self.targets) {
            return self.fail(e.into());
        }

        let columns = self.columns.as_deref().unwrap_or_default();
        let values = self.values.get_or_insert_with(HashMap::new);
        for (name, value) in columns.iter().zip(self.targets.iter()) {
            values.insert(name.clone(), value.clone());
        }
        self.state = CursorState::Positioned;
        true
    }

    fn fail(&mut self, err: Error) -> bool {
        self.err = Some(err);
        self.state = CursorState::Failed;
        self.values = None;
        false
    }

    /// The driver's stream error if set, else this cursor's own error.
    pub fn last_error(&self) -> Option<Error> {
        self.raw
            .error()
            .map(Error::from)
            .or_else(|| self.err.clone())
    }

    /// Release the driver cursor. Idempotent; the snapshot is kept.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.raw.close()?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Column names of the result set, available after the first advance.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Decode the current row positionally into `dest`.
    ///
    /// Conversions are lenient (see [`FromValue`](crate::FromValue)), unlike
    /// the typed getters.
    pub fn scan(&self, dest: &mut [&mut dyn ScanTarget]) -> Result<()> {
        if let Some(err) = self.last_error() {
            return Err(err);
        }
        if self.values.is_none() {
            return Err(Error::NoRows);
        }
        if dest.len() != self.targets.len() {
            return Err(Error::ColumnCount {
                expected: self.targets.len(),
                got: dest.len(),
            });
        }
        for (index, (target, value)) in dest.iter_mut().zip(self.targets.iter()).enumerate() {
            target
                .assign(value)
                .map_err(|reason| Error::Scan { index, reason })?;
        }
        Ok(())
    }

    fn validate(&self, column: &str) -> Result<&Value> {
        if let Some(err) = self.last_error() {
            return Err(err);
        }
        let values = self.values.as_ref().ok_or(Error::NoRows)?;
        values
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
    }

    fn typed<T>(
        &self,
        column: &str,
        requested: &'static str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T> {
        let value = self.validate(column)?;
        convert(value).ok_or_else(|| Error::InvalidTypeConversion {
            column: column.to_string(),
            requested,
            found: value.kind(),
        })
    }

    /// The raw value of a column in the current row.
    pub fn get_value(&self, column: &str) -> Result<&Value> {
        self.validate(column)
    }

    pub fn is_null(&self, column: &str) -> Result<bool> {
        self.validate(column).map(Value::is_null)
    }

    /// Get the boolean value in this row by column name.
    pub fn get_boolean(&self, column: &str) -> Result<bool> {
        self.typed(column, "boolean", Value::as_bool)
    }

    /// Get the integer value in this row by column name.
    ///
    /// Any signed integer kind is accepted and widened to `i64`.
    pub fn get_integer(&self, column: &str) -> Result<i64> {
        self.typed(column, "integer", Value::as_integer)
    }

    /// Get the float value in this row by column name.
    ///
    /// Any floating kind is accepted and widened to `f64`.
    pub fn get_double(&self, column: &str) -> Result<f64> {
        self.typed(column, "double", Value::as_double)
    }

    /// Get the string value in this row by column name.
    pub fn get_string(&self, column: &str) -> Result<String> {
        self.typed(column, "string", |v| v.as_str().map(str::to_owned))
    }

    /// Get the timestamp value in this row by column name.
    pub fn get_timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        self.typed(column, "timestamp", Value::as_timestamp)
    }

    /// Get the binary value in this row by column name.
    pub fn get_bytes(&self, column: &str) -> Result<Vec<u8>> {
        self.typed(column, "bytes", |v| v.as_bytes().map(<[u8]>::to_vec))
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("state", &self.state)
            .field("closed", &self.closed)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}
