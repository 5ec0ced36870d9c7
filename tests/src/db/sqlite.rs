use stowage::{ConnectionInformation, Registry};

use crate::{Setup, CONNECTION};

/// A fresh in-memory database per test; nothing to clean up.
pub struct SetupSqlite;

impl Setup for SetupSqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self) -> Option<Registry> {
        let mut registry = Registry::new();
        registry
            .add_connection(CONNECTION, ConnectionInformation::new("sqlite::memory:", "main"))
            .unwrap();
        Some(registry)
    }
}
