//! Scripted in-memory driver used by unit tests to reach failure paths a
//! real database won't produce on demand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use thiserror::Error;

use crate::driver::{Driver, RawConnection, RawRows, RawStatement, RawTransaction};
use crate::error::{DriverError, DriverResult};
use crate::types::Value;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ScriptedError(pub String);

fn fail<T>(msg: &str) -> DriverResult<T> {
    Err(DriverError::new(ScriptedError(msg.to_string())))
}

/// Call counters shared between a scripted object and the test.
#[derive(Clone, Default)]
pub struct Probe {
    advances: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Probe {
    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub fn people_row() -> Vec<Value> {
    vec![
        Value::Int64(1),
        Value::Text("john doe".to_string()),
        Value::Bool(true),
        Value::Float64(2.5),
        Value::Timestamp(Utc.with_ymd_and_hms(2016, 1, 2, 3, 4, 5).unwrap()),
    ]
}

pub struct ScriptedRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    position: usize,
    fail_columns: bool,
    fail_scan_at: Option<usize>,
    stream_error: Option<String>,
    err: Option<DriverError>,
    probe: Probe,
}

impl ScriptedRows {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> (Self, Probe) {
        let probe = Probe::default();
        let rows = Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            pending: rows.into(),
            current: None,
            position: 0,
            fail_columns: false,
            fail_scan_at: None,
            stream_error: None,
            err: None,
            probe: probe.clone(),
        };
        (rows, probe)
    }

    pub fn fail_columns(mut self) -> Self {
        self.fail_columns = true;
        self
    }

    pub fn fail_scan_at(mut self, row: usize) -> Self {
        self.fail_scan_at = Some(row);
        self
    }

    pub fn stream_error_after_rows(mut self, msg: &str) -> Self {
        self.stream_error = Some(msg.to_string());
        self
    }
}

impl RawRows for ScriptedRows {
    fn advance(&mut self) -> bool {
        self.probe.advances.fetch_add(1, Ordering::SeqCst);
        if self.current.is_some() {
            self.position += 1;
        }
        self.current = self.pending.pop_front();
        if self.current.is_none() {
            if let Some(msg) = self.stream_error.take() {
                self.err = Some(DriverError::new(ScriptedError(msg)));
            }
            return false;
        }
        true
    }

    fn columns(&self) -> DriverResult<Vec<String>> {
        if self.fail_columns {
            return fail("columns unavailable");
        }
        Ok(self.columns.clone())
    }

    fn scan(&mut self, targets: &mut [Value]) -> DriverResult<()> {
        if self.fail_scan_at == Some(self.position) {
            return fail("decode failed");
        }
        let Some(row) = self.current.as_ref() else {
            return fail("scan without a current row");
        };
        for (target, value) in targets.iter_mut().zip(row.iter()) {
            *target = value.clone();
        }
        Ok(())
    }

    fn error(&self) -> Option<DriverError> {
        self.err.clone()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A connection whose queries always return the same scripted result set.
pub struct ScriptedConnection {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    fail_close: Arc<AtomicBool>,
    fail_query: bool,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnection {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
            fail_close: Arc::new(AtomicBool::new(false)),
            fail_query: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[], Vec::new())
    }

    /// Toggle for close failures; flip it back to let a retry succeed.
    pub fn close_failure_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_close)
    }

    pub fn failing_close(self) -> Self {
        self.fail_close.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    fn rows(&self) -> DriverResult<Box<dyn RawRows>> {
        if self.fail_query {
            return fail("relation \"people\" does not exist");
        }
        let cols: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let (rows, _) = ScriptedRows::new(&cols, self.rows.clone());
        Ok(Box::new(rows))
    }
}

impl RawConnection for ScriptedConnection {
    fn execute(&self, _sql: &str, _params: &[Value]) -> DriverResult<u64> {
        Ok(0)
    }

    fn query(&self, _sql: &str, _params: &[Value]) -> DriverResult<Box<dyn RawRows>> {
        self.rows()
    }

    fn prepare(&self, _sql: &str) -> DriverResult<Box<dyn RawStatement>> {
        fail("prepare not scripted")
    }

    fn begin(&self) -> DriverResult<Box<dyn RawTransaction>> {
        fail("begin not scripted")
    }

    fn close(&self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return fail("close refused");
        }
        Ok(())
    }
}

/// A driver that opens [`ScriptedConnection::empty`] for any DSN except
/// `"unreachable"`.
pub struct ScriptedDriver;

impl Driver for ScriptedDriver {
    fn open(&self, dsn: &str) -> DriverResult<Box<dyn RawConnection>> {
        if dsn == "unreachable" {
            return fail("connection refused");
        }
        Ok(Box::new(ScriptedConnection::empty()))
    }
}
