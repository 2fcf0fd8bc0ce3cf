//! Dynamically-typed column values.
//!
//! A [`Value`] carries the kind the driver produced for a column alongside
//! the data. The strict `as_*` accessors back the typed getters on
//! [`Rows`](crate::Rows) and never coerce across kinds. [`FromValue`] backs
//! positional scanning and converts leniently, the way a generic SQL client
//! assigns into caller variables.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// A decoded column value or a bound statement parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

/// The runtime kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Blob,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int16 => "int16",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
            ValueKind::Text => "text",
            ValueKind::Blob => "blob",
            ValueKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

impl Value {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int16(_) => ValueKind::Int16,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::Text(_) => ValueKind::Text,
            Value::Blob(_) => ValueKind::Blob,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Exact `Bool` only.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any signed integer kind, widened to `i64`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int16(i) => Some(i64::from(*i)),
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Any floating kind, widened to `f64`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Float32(f) => Some(f64::from(*f)),
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Convenience macro for building parameter lists.
///
/// Usage: `params![1_i64, "john doe", true]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$($crate::Value::from($val)),*][..]
    };
}

// ============================================================================
// Positional decoding
// ============================================================================

/// Conversion from a column value into a Rust type for positional scans.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

/// A destination for [`Rows::scan`](crate::Rows::scan).
///
/// Implemented for every [`FromValue`] type, so heterogeneous destinations
/// can be passed as `&mut [&mut dyn ScanTarget]`.
pub trait ScanTarget {
    fn assign(&mut self, value: &Value) -> Result<(), String>;
}

impl<T: FromValue> ScanTarget for T {
    fn assign(&mut self, value: &Value) -> Result<(), String> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

fn unsupported(value: &Value, target: &str) -> String {
    format!("unsupported conversion of {} into {}", value.kind(), target)
}

fn int_from_value(value: &Value, target: &str) -> Result<i64, String> {
    match value {
        Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
            value.as_integer().ok_or_else(|| unsupported(value, target))
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("converting {:?} to {}: {}", s, target, e)),
        _ => Err(unsupported(value, target)),
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, String> {
                    let wide = int_from_value(value, stringify!($ty))?;
                    <$ty>::try_from(wide)
                        .map_err(|_| format!("value {} out of range for {}", wide, stringify!($ty)))
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float32(_) | Value::Float64(_) => {
                value.as_double().ok_or_else(|| unsupported(value, "f64"))
            }
            Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => value
                .as_integer()
                .map(|i| i as f64)
                .ok_or_else(|| unsupported(value, "f64")),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("converting {:?} to f64: {}", s, e)),
            _ => Err(unsupported(value, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float32(f) => Ok(*f),
            _ => f64::from_value(value).map(|f| f as f32),
        }
    }
}

/// Accepted text spellings of a boolean.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => match value.as_integer() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(format!("{:?} is not a valid bool", value)),
            },
            Value::Text(s) => {
                parse_bool(s).ok_or_else(|| format!("{:?} is not a valid bool", s))
            }
            _ => Err(unsupported(value, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int16(i) => Ok(i.to_string()),
            Value::Int32(i) => Ok(i.to_string()),
            Value::Int64(i) => Ok(i.to_string()),
            Value::Float32(f) => Ok(f.to_string()),
            Value::Float64(f) => Ok(f.to_string()),
            Value::Blob(b) => String::from_utf8(b.clone()).map_err(|e| e.to_string()),
            Value::Timestamp(t) => Ok(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Null => Err(unsupported(value, "String")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(unsupported(value, "Vec<u8>")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, String> {
        value
            .as_timestamp()
            .ok_or_else(|| unsupported(value, "DateTime<Utc>"))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
