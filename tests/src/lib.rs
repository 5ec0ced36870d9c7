pub mod db;
pub mod fixtures;
mod isolation;

pub use isolation::TestIsolation;

use stowage::{ConnectionKind, Interface, Registry};

/// Name the backend under test is registered as.
pub const CONNECTION: &str = "test";

/// A backend the shared scenarios run against.
pub trait Setup {
    fn name(&self) -> &'static str;

    /// Registers the backend as [`CONNECTION`], or returns `None` when it is
    /// not configured in the environment.
    fn connect(&self) -> Option<Registry>;

    /// Whether the backend can run multi-statement transactions.
    fn supports_transactions(&self) -> bool {
        true
    }

    /// Removes whatever the test created.
    fn cleanup(&self) {}
}

/// The registry a scenario runs against.
pub struct Db {
    registry: Registry,
    kind: ConnectionKind,
    transactions: bool,
}

impl Db {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A fresh interface for the backend under test.
    pub fn ifc(&self) -> Interface {
        self.registry.get_db_ifc(CONNECTION).unwrap()
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn supports_transactions(&self) -> bool {
        self.transactions
    }

    /// Picks the native filter for the backend: SQL text or a JSON document.
    pub fn native<'a>(&self, sql: &'a str, json: &'a str) -> &'a str {
        match self.kind {
            ConnectionKind::Relational(_) => sql,
            ConnectionKind::Document => json,
        }
    }
}

/// Runs `test` against `setup`, cleaning up afterwards even if it panics.
pub fn run<S: Setup>(setup: S, test: fn(&Db)) {
    init_logging();

    let Some(registry) = setup.connect() else {
        eprintln!("skipping: {} is not configured", setup.name());
        return;
    };

    let guard = Cleanup(&setup);
    let kind = registry
        .get_db_ifc(CONNECTION)
        .and_then(|ifc| ifc.connection().kind())
        .unwrap();
    let db = Db {
        registry,
        kind,
        transactions: setup.supports_transactions(),
    };

    test(&db);
    drop(db);
    drop(guard);
}

struct Cleanup<'a, S: Setup>(&'a S);

impl<S: Setup> Drop for Cleanup<'_, S> {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}

/// Installs a `tracing` subscriber honoring `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[macro_export]
macro_rules! tests {
    (
        $(
            $( #[$attrs:meta] )*
            $f:ident
        ),+ $(,)?
    ) => {
        mod sqlite {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    $crate::run($crate::db::sqlite::SetupSqlite, super::$f);
                }
            )*
        }

        mod postgresql {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    $crate::run($crate::db::postgresql::SetupPostgreSQL::new(), super::$f);
                }
            )*
        }

        mod mongodb {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    $crate::run($crate::db::mongodb::SetupMongoDb::new(), super::$f);
                }
            )*
        }
    };
}
