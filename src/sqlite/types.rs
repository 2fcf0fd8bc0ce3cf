//! SQLite type encoding and decoding.
//!
//! SQLite stores only NULL, INTEGER, REAL, TEXT and BLOB. The declared
//! column type decides how a stored value is surfaced: `BOOLEAN` columns
//! come back as [`Value::Bool`], `TIMESTAMP`/`DATETIME`/`DATE` columns as
//! [`Value::Timestamp`], everything else as stored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

use super::error::{SqliteError, SqliteResult};
use crate::types::{parse_bool, Value};

/// Layout used when binding timestamps.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Accepted layouts for timestamps stored as text without an offset.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclaredType {
    Boolean,
    Timestamp,
    Other,
}

impl DeclaredType {
    pub(crate) fn from_decl(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return DeclaredType::Other;
        };
        let decl = decl.to_ascii_uppercase();
        if decl.starts_with("BOOL") {
            DeclaredType::Boolean
        } else if decl.starts_with("TIMESTAMP") || decl.starts_with("DATETIME") || decl == "DATE" {
            DeclaredType::Timestamp
        } else {
            DeclaredType::Other
        }
    }

    fn name(self) -> &'static str {
        match self {
            DeclaredType::Boolean => "boolean",
            DeclaredType::Timestamp => "timestamp",
            DeclaredType::Other => "other",
        }
    }
}

/// Parse a timestamp stored as text.
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(t.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn decode_error(column: &str, decl: DeclaredType, reason: String) -> SqliteError {
    SqliteError::Decode {
        column: column.to_string(),
        decl_type: decl.name().to_string(),
        reason,
    }
}

/// Convert a stored SQLite value into a [`Value`] using the column's
/// declared type.
pub(crate) fn decode(column: &str, decl: DeclaredType, raw: &SqlValue) -> SqliteResult<Value> {
    let value = match (decl, raw) {
        (_, SqlValue::Null) => Value::Null,

        (DeclaredType::Boolean, SqlValue::Integer(i)) => Value::Bool(*i != 0),
        (DeclaredType::Boolean, SqlValue::Text(s)) => {
            parse_bool(s).map_or_else(|| Value::Text(s.clone()), Value::Bool)
        }

        (DeclaredType::Timestamp, SqlValue::Integer(secs)) => DateTime::from_timestamp(*secs, 0)
            .map(Value::Timestamp)
            .ok_or_else(|| decode_error(column, decl, format!("{} is out of range", secs)))?,
        (DeclaredType::Timestamp, SqlValue::Text(s)) => parse_timestamp(s)
            .map(Value::Timestamp)
            .ok_or_else(|| decode_error(column, decl, format!("unrecognized timestamp {:?}", s)))?,

        (_, SqlValue::Integer(i)) => Value::Int64(*i),
        (_, SqlValue::Real(f)) => Value::Float64(*f),
        (_, SqlValue::Text(s)) => Value::Text(s.clone()),
        (_, SqlValue::Blob(b)) => Value::Blob(b.clone()),
    };
    Ok(value)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int16(i) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*i))),
            Value::Int32(i) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*i))),
            Value::Int64(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float32(f) => ToSqlOutput::Owned(SqlValue::Real(f64::from(*f))),
            Value::Float64(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            // Borrow text and blobs instead of cloning them
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Timestamp(t) => {
                ToSqlOutput::Owned(SqlValue::Text(t.naive_utc().format(TIMESTAMP_FORMAT).to_string()))
            }
        };
        Ok(out)
    }
}
