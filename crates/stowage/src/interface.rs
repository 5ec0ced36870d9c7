use crate::connection::{Context, Selection};
use crate::transaction::Journal;
use crate::{Connection, Cursor};

use stowage_core::driver::QueryOptions;
use stowage_core::{Error, Object, Result};

use std::sync::Arc;
use std::time::Duration;

/// A handle for persisting objects through one named connection.
///
/// Handles are cheap to clone. The `with_*` methods return a reconfigured
/// copy and leave the original untouched.
#[derive(Debug, Clone)]
pub struct Interface {
    connection_name: String,
    database: String,
    connection: Arc<Connection>,
    options: QueryOptions,
    journal: Option<Arc<Journal>>,
}

impl Interface {
    pub(crate) fn new(
        connection_name: &str,
        database: &str,
        connection: Arc<Connection>,
    ) -> Interface {
        Interface {
            connection_name: connection_name.to_string(),
            database: database.to_string(),
            connection,
            options: QueryOptions::default(),
            journal: None,
        }
    }

    /// Binds the handle to a transaction's journal.
    pub(crate) fn bound(mut self, journal: Arc<Journal>) -> Interface {
        self.journal = Some(journal);
        self
    }

    pub(crate) fn shared_connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn count_cursor(&self) -> bool {
        self.options.count_only
    }

    pub fn dirty_read(&self) -> bool {
        self.options.dirty_read
    }

    pub fn query_skip(&self) -> u64 {
        self.options.skip
    }

    pub fn query_limit(&self) -> Option<u64> {
        self.options.limit
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }

    /// Queries return only the number of matches.
    pub fn with_count_cursor(&self, enabled: bool) -> Interface {
        let mut copy = self.clone();
        copy.options.count_only = enabled;
        copy
    }

    pub fn with_dirty_read(&self, enabled: bool) -> Interface {
        let mut copy = self.clone();
        copy.options.dirty_read = enabled;
        copy
    }

    pub fn with_query_skip(&self, skip: u64) -> Interface {
        let mut copy = self.clone();
        copy.options.skip = skip;
        copy
    }

    /// Caps the rows a query returns; 0 removes the cap.
    pub fn with_query_limit(&self, limit: u64) -> Interface {
        let mut copy = self.clone();
        copy.options.limit = (limit > 0).then_some(limit);
        copy
    }

    pub fn with_timeout(&self, timeout: Duration) -> Interface {
        let mut copy = self.clone();
        copy.options.timeout = (!timeout.is_zero()).then_some(timeout);
        copy
    }

    /// Reads the stored object with the same key into `object`.
    ///
    /// Returns `false`, leaving `object` as it was, when nothing is stored
    /// under that key.
    pub fn load(&self, object: &mut Object) -> Result<bool> {
        self.connection.load(self.context(), object)
    }

    /// Stores `object`, then advances its version and clears its modified
    /// flags.
    ///
    /// An object at version `n > 0` is written only if the store still holds
    /// version `n`; otherwise the save fails with a version conflict. Version
    /// 0 always inserts. Version -1, and an object without a version field,
    /// inserts or overwrites whatever is stored under the key.
    pub fn save(&self, object: &mut Object) -> Result<()> {
        let before = self.before_image(object)?;
        tracing::debug!(connection = %self.connection_name, object = %object.describe_key(), "save");
        self.connection.save(self.context(), object)?;
        self.record(object, before, false);
        Ok(())
    }

    /// Stores `object` like [`save`](Self::save) without touching it.
    pub fn save_const(&self, object: &Object) -> Result<()> {
        let mut copy = object.clone();
        self.save(&mut copy)
    }

    /// Deletes the stored object, returning whether one existed.
    ///
    /// With a version above 0, only that version is deleted. If no row holds
    /// it, whether the row was changed or already removed, the destroy fails
    /// with a version conflict.
    pub fn destroy(&self, object: &Object) -> Result<bool> {
        let before = self.before_image(object)?;
        tracing::debug!(connection = %self.connection_name, object = %object.describe_key(), "destroy");
        let existed = self.connection.destroy(self.context(), object)?;
        if existed {
            self.record(object, before, true);
        }
        Ok(existed)
    }

    /// Drops the table or collection of `object`'s type, with its child tables.
    pub fn drop_all(&self, object: &Object) -> Result<()> {
        self.connection.drop_all(self.context(), object)
    }

    /// Creates the table or collection of `object`'s type if missing.
    pub fn structure(&self, object: &Object) -> Result<()> {
        self.connection.structure(self.context(), object)
    }

    /// Runs a query written in the backend's own filter language: an SQL
    /// condition, or a JSON filter document for MongoDB. Empty text matches
    /// everything.
    pub fn query(&self, object: &Object, filter: &str) -> Result<Cursor> {
        self.connection
            .query(self.context(), object, Selection::Native(filter))
    }

    /// Finds objects equal to `example` in every modified field and every
    /// key field that is set.
    pub fn qbe(&self, example: &Object) -> Result<Cursor> {
        self.connection
            .query(self.context(), example, Selection::Example)
    }

    /// Reads the cursor's current object into `object`.
    pub fn retrieve(&self, object: &mut Object, cursor: &mut Cursor) -> Result<()> {
        if !cursor.valid() {
            return Err(Error::cursor_exhausted());
        }
        self.connection.retrieve(object, cursor)
    }

    fn context(&self) -> Context<'_> {
        Context {
            database: &self.database,
            options: &self.options,
            transaction: self.journal.as_ref().map(|journal| journal.transaction()),
        }
    }

    /// The stored state an audit record starts from, when auditing.
    fn before_image(&self, object: &Object) -> Result<Option<Object>> {
        let Some(journal) = &self.journal else {
            return Ok(None);
        };
        if !journal.enabled() {
            return Ok(None);
        }

        let mut stored = object.clone();
        Ok(self
            .connection
            .load(self.context(), &mut stored)?
            .then_some(stored))
    }

    fn record(&self, object: &Object, before: Option<Object>, destroy: bool) {
        let Some(journal) = &self.journal else {
            return;
        };
        if journal.enabled() {
            journal.record(self, object, before, destroy);
        }
    }
}
