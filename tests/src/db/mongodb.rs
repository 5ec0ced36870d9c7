use stowage::{ConnectionInformation, Registry};

use crate::{Setup, TestIsolation, CONNECTION};

const URL_VAR: &str = "STOWAGE_MONGODB_URL";

/// Set when the server is a replica set and can run transactions.
const TRANSACTIONS_VAR: &str = "STOWAGE_MONGODB_TRANSACTIONS";

/// Runs each test in its own database on the server `STOWAGE_MONGODB_URL`
/// names.
pub struct SetupMongoDb {
    isolation: TestIsolation,
}

impl SetupMongoDb {
    pub fn new() -> Self {
        Self {
            isolation: TestIsolation::new(),
        }
    }
}

impl Default for SetupMongoDb {
    fn default() -> Self {
        Self::new()
    }
}

impl Setup for SetupMongoDb {
    fn name(&self) -> &'static str {
        "mongodb"
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

    fn supports_transactions(&self) -> bool {
        std::env::var_os(TRANSACTIONS_VAR).is_some()
    }

    fn cleanup(&self) {
        let Ok(url) = std::env::var(URL_VAR) else {
            return;
        };
        let dropped = mongodb::sync::Client::with_uri_str(&url).and_then(|client| {
            client
                .database(&self.isolation.namespace())
                .drop()
                .run()
        });
        if let Err(err) = dropped {
            eprintln!("MongoDB cleanup failed: {err}");
        }
    }
}
