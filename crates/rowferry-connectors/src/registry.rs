//! The driver registry.
//!
//! One process-wide name → driver table, populated once at startup by
//! [`register_builtin_drivers`] (and by embedders registering their own
//! drivers) and read-many afterwards. This is the only global state in
//! the system.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::cockroach::CockroachDriver;
use crate::driver::Driver;
use crate::error::ConnectorError;
use crate::mysql::MySqlDriver;

/// Name → driver table.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver under its own name, replacing any previous
    /// registration of that name.
    pub fn register(&self, driver: Arc<dyn Driver>) {
        let name = driver.name().to_owned();
        self.drivers.write().insert(name, driver);
    }

    /// Looks a driver up by name.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::DriverNotFound`] for unregistered names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>, ConnectorError> {
        self.drivers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectorError::DriverNotFound(name.to_owned()))
    }

    /// Reports whether a driver is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.drivers.read().contains_key(name)
    }

    /// Registered driver names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// The process-wide registry.
pub fn global() -> &'static DriverRegistry {
    static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
    GLOBAL.get_or_init(DriverRegistry::new)
}

/// Registers the built-in drivers (`mysql`, `cockroach`) into the global
/// registry. Idempotent; call once at process startup.
pub fn register_builtin_drivers() {
    let registry = global();
    if !registry.contains("mysql") {
        registry.register(Arc::new(MySqlDriver::new()));
    }
    if !registry.contains("cockroach") {
        registry.register(Arc::new(CockroachDriver::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_unknown_name() {
        let registry = DriverRegistry::new();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, ConnectorError::DriverNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_register_builtin_drivers_idempotent() {
        register_builtin_drivers();
        register_builtin_drivers();
        let registry = global();
        assert!(registry.contains("mysql"));
        assert!(registry.contains("cockroach"));

        let mysql = registry.get("mysql").unwrap();
        assert!(mysql.is_readable());
        assert!(!mysql.is_writable());

        let cockroach = registry.get("cockroach").unwrap();
        assert!(!cockroach.is_readable());
        assert!(cockroach.is_writable());
    }
}
