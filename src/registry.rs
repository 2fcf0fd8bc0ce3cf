//! Named registry of open database connections.
//!
//! Connections are opened under a caller-chosen name and can be fetched by
//! that name from anywhere holding the registry. Most programs use the
//! process-wide [`Registry::global`]; tests build their own with
//! [`Registry::new`] so they don't interfere with each other.
//!
//! All map access goes through one `RwLock`: lookups share it, open/adopt/
//! close take it exclusively. Opening holds the lock across the driver's
//! connect call and `close_all` holds it across every close; connection
//! counts are small and operator-managed, so that's acceptable.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::driver::{Driver, RawConnection};
use crate::error::{Error, Result};
use crate::sqlite::SqliteDriver;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

pub(crate) struct RegistryInner {
    pub(crate) connections: RwLock<HashMap<String, Arc<Connection>>>,
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

/// A name → connection registry. Cloning shares the same registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with the built-in SQLite driver available
    /// as `"sqlite3"` and `"sqlite"`.
    pub fn new() -> Self {
        let sqlite: Arc<dyn Driver> = Arc::new(SqliteDriver::default());
        let mut drivers: HashMap<String, Arc<dyn Driver>> = HashMap::new();
        drivers.insert("sqlite3".to_string(), Arc::clone(&sqlite));
        drivers.insert("sqlite".to_string(), sqlite);

        Self {
            inner: Arc::new(RegistryInner {
                connections: RwLock::new(HashMap::new()),
                drivers: RwLock::new(drivers),
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Make a driver available under `name`, replacing any previous one.
    pub fn register_driver(&self, name: &str, driver: impl Driver + 'static) {
        self.inner
            .drivers
            .write()
            .insert(name.to_string(), Arc::new(driver));
    }

    fn driver(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.inner
            .drivers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownDriver(name.to_string()))
    }

    /// Open a new database connection and save it under `name`.
    pub fn open(&self, name: &str, driver: &str, dsn: &str) -> Result<Arc<Connection>> {
        let mut connections = self.inner.connections.write();
        if connections.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let raw = self.driver(driver)?.open(dsn)?;
        debug!(connection = name, driver, "opened database connection");
        Ok(self.insert(&mut connections, name, raw))
    }

    /// Manage an already open connection and save it under `name`.
    pub fn adopt(&self, name: &str, raw: Box<dyn RawConnection>) -> Result<Arc<Connection>> {
        let mut connections = self.inner.connections.write();
        if connections.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        debug!(connection = name, "adopted database connection");
        Ok(self.insert(&mut connections, name, raw))
    }

    fn insert(
        &self,
        connections: &mut HashMap<String, Arc<Connection>>,
        name: &str,
        raw: Box<dyn RawConnection>,
    ) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(raw, Arc::downgrade(&self.inner)));
        connections.insert(name.to_string(), Arc::clone(&conn));
        conn
    }

    /// Get an open connection by name.
    pub fn get(&self, name: &str) -> Option<Arc<Connection>> {
        self.inner.connections.read().get(name).cloned()
    }

    /// Names of the open connections, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.connections.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.connections.read().is_empty()
    }

    /// Close every open connection.
    ///
    /// Connections that close are removed. Those that fail stay registered
    /// and are returned with their error so the caller can retry or inspect.
    pub fn close_all(&self) -> Vec<(String, Error)> {
        let mut connections = self.inner.connections.write();
        let mut failures = Vec::new();
        connections.retain(|name, conn| match conn.raw().close() {
            Ok(()) => {
                debug!(connection = %name, "closed database connection");
                false
            }
            Err(e) => {
                warn!(connection = %name, error = %e, "failed to close database connection");
                failures.push((name.clone(), Error::from(e)));
                true
            }
        });
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        failures
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{people_row, ScriptedConnection, ScriptedDriver};
    use proptest::prelude::*;
    use std::sync::atomic::Ordering;

    fn scripted_registry() -> Registry {
        let registry = Registry::new();
        registry.register_driver("scripted", ScriptedDriver);
        registry
    }

    #[test]
    fn test_open_and_get() {
        let registry = scripted_registry();
        let conn = registry.open("master", "scripted", "db://master").unwrap();
        let found = registry.get("master").unwrap();
        assert!(Arc::ptr_eq(&conn, &found));
        assert!(registry.get("replica").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_leaves_entry_untouched() {
        let registry = scripted_registry();
        let first = registry.open("master", "scripted", "db://a").unwrap();

        let err = registry.open("master", "scripted", "db://b").unwrap_err();
        assert!(matches!(err, Error::DuplicateName(ref n) if n == "master"));

        let err = registry
            .adopt("master", Box::new(ScriptedConnection::empty()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(_)));

        assert!(Arc::ptr_eq(&first, &registry.get("master").unwrap()));
        assert_eq!(registry.names(), vec!["master"]);
    }

    #[test]
    fn test_unknown_driver() {
        let registry = scripted_registry();
        let err = registry.open("master", "oracle", "whatever").unwrap_err();
        assert!(matches!(err, Error::UnknownDriver(ref d) if d == "oracle"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_driver_open_error_passes_through() {
        let registry = scripted_registry();
        let err = registry.open("master", "scripted", "unreachable").unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
        assert_eq!(err.to_string(), "connection refused");
        assert!(registry.get("master").is_none());
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = scripted_registry();
        for name in ["zulu", "alpha", "mike"] {
            registry.open(name, "scripted", "db").unwrap();
        }
        assert_eq!(registry.names(), vec!["alpha", "mike", "zulu"]);
    }

    #[test]
    fn test_close_deregisters_by_identity() {
        let registry = scripted_registry();
        let a = registry.open("a", "scripted", "db").unwrap();
        registry.open("b", "scripted", "db").unwrap();

        a.close().unwrap();
        assert_eq!(registry.names(), vec!["b"]);

        // Second close is whatever the driver does; nothing left to deregister.
        a.close().unwrap();
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[test]
    fn test_close_failure_keeps_entry() {
        let registry = scripted_registry();
        let conn = registry
            .adopt("stuck", Box::new(ScriptedConnection::empty().failing_close()))
            .unwrap();
        assert_eq!(conn.close().unwrap_err().to_string(), "close refused");
        assert_eq!(registry.names(), vec!["stuck"]);
    }

    #[test]
    fn test_close_all_keeps_failures() {
        let registry = scripted_registry();
        let stuck = ScriptedConnection::empty().failing_close();
        let switch = stuck.close_failure_switch();
        let attempts = stuck.close_counter();
        registry.adopt("stuck", Box::new(stuck)).unwrap();
        registry.open("fine", "scripted", "db").unwrap();
        registry.open("also_fine", "scripted", "db").unwrap();

        let failures = registry.close_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "stuck");
        assert_eq!(registry.names(), vec!["stuck"]);

        switch.store(false, Ordering::SeqCst);
        assert!(registry.close_all().is_empty());
        assert!(registry.is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_close_after_registry_dropped() {
        let registry = scripted_registry();
        let conn = registry.open("orphan", "scripted", "db").unwrap();
        drop(registry);
        conn.close().unwrap();
    }

    #[test]
    fn test_registries_are_independent() {
        let one = scripted_registry();
        let two = scripted_registry();
        one.open("master", "scripted", "db").unwrap();
        assert!(two.get("master").is_none());
        two.open("master", "scripted", "db").unwrap();
        assert_eq!(one.names(), two.names());
    }

    #[test]
    fn test_adopted_connection_queries() {
        let registry = Registry::new();
        let raw = ScriptedConnection::new(
            &["id", "name", "married", "ratio", "last_modified"],
            vec![people_row()],
        );
        registry.adopt("people", Box::new(raw)).unwrap();
        let mut row = registry.get("people").unwrap().query_row("select", &[]);
        assert_eq!(row.get_string("name").unwrap(), "john doe");
    }

    #[test]
    fn test_query_failure_defers_into_row() {
        let registry = Registry::new();
        let raw = ScriptedConnection::empty().failing_query();
        let conn = registry.adopt("broken", Box::new(raw)).unwrap();

        assert!(matches!(conn.query("select", &[]), Err(Error::Driver(_))));
        let mut row = conn.query_row("select", &[]);
        assert_eq!(
            row.get_integer("id").unwrap_err().to_string(),
            "relation \"people\" does not exist"
        );
    }

    #[test]
    fn test_global_registry_is_shared() {
        let name = "global-registry-test";
        Registry::global()
            .adopt(name, Box::new(ScriptedConnection::empty()))
            .unwrap();
        assert!(Registry::global().get(name).is_some());
        Registry::global().get(name).unwrap().close().unwrap();
        assert!(Registry::global().get(name).is_none());
    }

    proptest! {
        #[test]
        fn prop_names_sorted_and_unique(names in proptest::collection::vec("[a-z]{1,6}", 0..12)) {
            let registry = scripted_registry();
            for name in &names {
                let _ = registry.open(name, "scripted", "db");
            }
            let listed = registry.names();
            let mut expected: Vec<String> = names.clone();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(listed, expected);
        }

        #[test]
        fn prop_closed_names_disappear(names in proptest::collection::btree_set("[a-z]{1,6}", 1..8)) {
            let registry = scripted_registry();
            let handles: Vec<_> = names
                .iter()
                .map(|n| registry.open(n, "scripted", "db").unwrap())
                .collect();
            handles[0].close().unwrap();
            let first = names.iter().next().unwrap();
            prop_assert!(!registry.names().contains(first));
            prop_assert_eq!(registry.len(), names.len() - 1);
        }
    }
}
