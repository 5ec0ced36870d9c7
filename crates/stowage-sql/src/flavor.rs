use stowage_core::driver::{IsolationLevel, ScopeOp};

use std::time::Duration;

/// SQL dialect of a relational connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Postgresql,
    Sqlite,
}

impl Flavor {
    /// Statement text for one scope transition.
    pub fn scope_sql(self, op: &ScopeOp) -> String {
        match (self, op) {
            (Flavor::Postgresql, ScopeOp::Begin(isolation)) => {
                format!("BEGIN ISOLATION LEVEL {}", isolation.sql_name())
            }
            (Flavor::Sqlite, ScopeOp::Begin(IsolationLevel::Serializable)) => {
                "BEGIN IMMEDIATE".to_string()
            }
            _ => op.sql(),
        }
    }

    /// Statement setting the per-statement timeout; `None` restores the default.
    ///
    /// SQLite has no statement timeout, only a busy wait configured on the
    /// connection handle, so it has none.
    pub fn timeout_sql(self, timeout: Option<Duration>) -> Option<String> {
        match (self, timeout) {
            (Flavor::Postgresql, Some(timeout)) => {
                Some(format!("SET statement_timeout = {}", timeout.as_millis()))
            }
            (Flavor::Postgresql, None) => Some("RESET statement_timeout".to_string()),
            (Flavor::Sqlite, _) => None,
        }
    }

    /// Statement toggling uncommitted reads, for dialects with a switch for it.
    ///
    /// PostgreSQL never exposes uncommitted data, so it has none.
    pub fn dirty_read_sql(self, enabled: bool) -> Option<String> {
        match self {
            Flavor::Sqlite => Some(format!("PRAGMA read_uncommitted = {}", enabled as u8)),
            Flavor::Postgresql => None,
        }
    }

    /// Writes the `n`-th (1-based) positional placeholder.
    pub(crate) fn placeholder(self, n: usize) -> String {
        match self {
            Flavor::Postgresql => format!("${n}"),
            Flavor::Sqlite => format!("?{n}"),
        }
    }

    /// Whether table names may be qualified with a schema.
    pub fn supports_schemas(self) -> bool {
        matches!(self, Flavor::Postgresql)
    }
}
