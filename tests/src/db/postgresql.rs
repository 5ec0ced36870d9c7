use stowage::{ConnectionInformation, Registry};
use stowage_driver_postgresql::PostgreSQL;
use stowage_sql::Exec;

use crate::{Setup, TestIsolation, CONNECTION};

const URL_VAR: &str = "STOWAGE_POSTGRES_URL";

/// Runs each test in its own schema of the database `STOWAGE_POSTGRES_URL`
/// names.
pub struct SetupPostgreSQL {
    isolation: TestIsolation,
}

impl SetupPostgreSQL {
    pub fn new() -> Self {
        Self {
            isolation: TestIsolation::new(),
        }
    }
}

impl Default for SetupPostgreSQL {
    fn default() -> Self {
        Self::new()
    }
}

impl Setup for SetupPostgreSQL {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn connect(&self) -> Option<Registry> {
        let url = std::env::var(URL_VAR).ok()?;

        let mut registry = Registry::new();
        registry
            .add_connection("base", ConnectionInformation::new(url, ""))
            .unwrap();
        registry
            .copy_connection(CONNECTION, "base", &self.isolation.namespace())
            .unwrap();
        Some(registry)
    }

    fn cleanup(&self) {
        let Ok(url) = std::env::var(URL_VAR) else {
            return;
        };
        match PostgreSQL::connect(&url) {
            Ok(mut client) => {
                let sql = format!(
                    "DROP SCHEMA IF EXISTS \"{}\" CASCADE",
                    self.isolation.namespace()
                );
                if let Err(err) = client.batch(&sql) {
                    eprintln!("PostgreSQL cleanup failed: {err}");
                }
            }
            Err(err) => eprintln!("PostgreSQL cleanup failed: {err}"),
        }
    }
}
