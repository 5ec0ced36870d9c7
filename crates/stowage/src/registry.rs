use crate::{Connection, ConnectionInformation, Interface, Transaction};

use stowage_core::{Error, Result};

use std::collections::HashMap;
use std::sync::Arc;

/// Named connections an application persists through.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

#[derive(Debug)]
struct Entry {
    connection: Arc<Connection>,
    database: String,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Opens a connection and registers it under `name`, replacing any
    /// connection already registered there.
    pub fn add_connection(&mut self, name: &str, info: ConnectionInformation) -> Result<()> {
        let database = info.database().to_string();
        let connection = Connection::connect(name, info)?;

        let previous = self.entries.insert(
            name.to_string(),
            Entry {
                connection: Arc::new(connection),
                database,
            },
        );
        if previous.is_some() {
            tracing::info!(connection = name, "connection replaced");
        }
        Ok(())
    }

    /// Registers `name` as an alias of `source` that addresses `database`
    /// on the same connection.
    pub fn copy_connection(&mut self, name: &str, source: &str, database: &str) -> Result<()> {
        let connection = self.entry(source)?.connection.clone();
        self.entries.insert(
            name.to_string(),
            Entry {
                connection,
                database: database.to_string(),
            },
        );
        tracing::debug!(connection = name, source, database, "connection alias added");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// An interface for the connection registered under `name`.
    pub fn get_db_ifc(&self, name: &str) -> Result<Interface> {
        let entry = self.entry(name)?;
        Ok(Interface::new(name, &entry.database, entry.connection.clone()))
    }

    /// Starts a transaction. Connections join as interfaces are requested
    /// from it.
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Runs `f` in a transaction, committing when it returns `Ok` and
    /// rolling back every joined connection when it returns `Err`.
    pub fn execute<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut transaction = self.transaction();
        match f(&mut transaction) {
            Ok(value) => {
                transaction.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = transaction.rollback() {
                    tracing::warn!(error = %rollback, "rollback after failed callback failed");
                }
                Err(err)
            }
        }
    }

    fn entry(&self, name: &str) -> Result<&Entry> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::unknown_connection(name))
    }
}
