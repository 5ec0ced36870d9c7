mod document;
mod relational;

use crate::{ConnectionInformation, Cursor};
use document::DocumentStore;
use relational::Relational;

use stowage_core::driver::{IsolationLevel, NestingTracker, QueryOptions, ScopeOp, TransactionId};
use stowage_core::{err, Error, Object, Result};
use stowage_sql::Flavor;

use std::sync::{Mutex, MutexGuard};

/// Backend family behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Relational(Flavor),
    Document,
}

/// An open backend session shared by every interface using its name.
///
/// Calls are serialized through a lock around the backend client.
pub struct Connection {
    name: String,
    info: ConnectionInformation,
    backend: Mutex<Backend>,
}

enum Backend {
    Relational(Relational),
    Document(DocumentStore),
}

/// Per-call settings an interface hands to its connection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub(crate) database: &'a str,
    pub(crate) options: &'a QueryOptions,
    pub(crate) transaction: Option<TransactionId>,
}

/// Selection for [`Connection::query`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Selection<'a> {
    Native(&'a str),
    Example,
}

impl Connection {
    pub(crate) fn connect(name: &str, info: ConnectionInformation) -> Result<Connection> {
        let url = info.connect_url()?;
        let scheme = url.split(':').next().unwrap_or_default();

        let backend = match scheme {
            "sqlite" => connect_sqlite(&url)?,
            "postgresql" | "postgres" => connect_postgresql(&url)?,
            "mongodb" | "mongodb+srv" => Backend::Document(DocumentStore::connect(&url)?),
            scheme => {
                return Err(Error::invalid_connection_url(format!(
                    "unsupported database; scheme={scheme}; url={}",
                    info.url()
                )))
            }
        };

        tracing::info!(connection = name, url = info.url(), "connection added");
        Ok(Connection {
            name: name.to_string(),
            info,
            backend: Mutex::new(backend),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &ConnectionInformation {
        &self.info
    }

    pub fn kind(&self) -> Result<ConnectionKind> {
        Ok(match &*self.lock()? {
            Backend::Relational(backend) => ConnectionKind::Relational(backend.flavor()),
            Backend::Document(_) => ConnectionKind::Document,
        })
    }

    pub(crate) fn load(&self, cx: Context<'_>, object: &mut Object) -> Result<bool> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.load(self.schema(cx), cx, object),
            Backend::Document(backend) => backend.load(cx, object),
        }
    }

    pub(crate) fn save(&self, cx: Context<'_>, object: &mut Object) -> Result<()> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.save(self.schema(cx), cx, object),
            Backend::Document(backend) => backend.save(cx, object),
        }
    }

    pub(crate) fn destroy(&self, cx: Context<'_>, object: &Object) -> Result<bool> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.destroy(self.schema(cx), cx, object),
            Backend::Document(backend) => backend.destroy(cx, object),
        }
    }

    pub(crate) fn drop_all(&self, cx: Context<'_>, object: &Object) -> Result<()> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.drop_all(self.schema(cx), object),
            Backend::Document(backend) => backend.drop_all(cx, object),
        }
    }

    pub(crate) fn structure(&self, cx: Context<'_>, object: &Object) -> Result<()> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.structure(self.schema(cx), object),
            Backend::Document(backend) => backend.structure(cx, object),
        }
    }

    pub(crate) fn query(
        &self,
        cx: Context<'_>,
        object: &Object,
        selection: Selection<'_>,
    ) -> Result<Cursor> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.query(self.schema(cx), cx, object, selection),
            Backend::Document(backend) => backend.query(cx, object, selection),
        }
    }

    pub(crate) fn retrieve(&self, object: &mut Object, cursor: &mut Cursor) -> Result<()> {
        match &mut *self.lock()? {
            Backend::Relational(backend) => backend.retrieve(object, cursor),
            Backend::Document(_) => document::retrieve(object, cursor),
        }
    }

    /// Binds `id` to this connection, beginning a backend transaction the
    /// first time.
    pub(crate) fn start_transaction(
        &self,
        id: TransactionId,
        isolation: IsolationLevel,
    ) -> Result<()> {
        let mut backend = self.lock()?;
        let Some(op) = backend.tracker().start_transaction(id, isolation)? else {
            return Ok(());
        };

        tracing::debug!(connection = %self.name, transaction = %id, ?isolation, "begin");
        if let Err(err) = backend.begin_transaction(op) {
            backend.tracker().rollback_transaction(id)?;
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn end_transaction(&self, id: TransactionId) -> Result<()> {
        let mut backend = self.lock()?;
        let op = backend.tracker().end_transaction(id)?;
        tracing::debug!(connection = %self.name, transaction = %id, "commit");
        backend.finish_transaction(op)
    }

    pub(crate) fn rollback_transaction(&self, id: TransactionId) -> Result<()> {
        let mut backend = self.lock()?;
        let op = backend.tracker().rollback_transaction(id)?;
        tracing::debug!(connection = %self.name, transaction = %id, "rollback");
        backend.finish_transaction(op)
    }

    /// Schema qualifier for relational statements: an alias whose database
    /// differs from the connection's own addresses a schema of that name.
    fn schema<'a>(&self, cx: Context<'a>) -> Option<&'a str> {
        Some(cx.database).filter(|database| *database != self.info.database())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Backend>> {
        self.backend
            .lock()
            .map_err(|_| err!("connection `{}` is poisoned", self.name))
    }
}

impl core::fmt::Debug for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Backend {
    fn tracker(&mut self) -> &mut NestingTracker {
        match self {
            Backend::Relational(backend) => backend.tracker(),
            Backend::Document(backend) => backend.tracker(),
        }
    }

    fn begin_transaction(&mut self, op: ScopeOp) -> Result<()> {
        match self {
            Backend::Relational(backend) => backend.apply(op),
            Backend::Document(backend) => backend.begin_transaction(op),
        }
    }

    fn finish_transaction(&mut self, op: ScopeOp) -> Result<()> {
        match self {
            Backend::Relational(backend) => backend.apply(op),
            Backend::Document(backend) => backend.finish_transaction(op),
        }
    }
}

/// A backend that can open and close nested scopes.
trait Scoped {
    fn tracker(&mut self) -> &mut NestingTracker;

    fn apply(&mut self, op: ScopeOp) -> Result<()>;
}

/// Runs `f` inside one scope: a top-level transaction when the connection is
/// idle, a savepoint when `transaction` is bound to it.
fn within<B: Scoped, T>(
    backend: &mut B,
    transaction: Option<TransactionId>,
    f: impl FnOnce(&mut B) -> Result<T>,
) -> Result<T> {
    let op = backend.tracker().enter(transaction)?;
    if let Err(err) = backend.apply(op) {
        backend.tracker().abort();
        return Err(err);
    }

    match f(backend) {
        Ok(value) => {
            let op = backend.tracker().leave();
            backend.apply(op)?;
            Ok(value)
        }
        Err(err) => {
            let op = backend.tracker().abort();
            if let Err(rollback) = backend.apply(op) {
                tracing::warn!(error = %rollback, "rollback after failure failed");
            }
            Err(err)
        }
    }
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &str) -> Result<Backend> {
    let driver = stowage_driver_sqlite::Sqlite::connect(url)?;
    Ok(Backend::Relational(Relational::new(Box::new(driver))))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &str) -> Result<Backend> {
    Err(Error::invalid_connection_url("`sqlite` feature not enabled"))
}

#[cfg(feature = "postgresql")]
fn connect_postgresql(url: &str) -> Result<Backend> {
    let driver = stowage_driver_postgresql::PostgreSQL::connect(url)?;
    Ok(Backend::Relational(Relational::new(Box::new(driver))))
}

#[cfg(not(feature = "postgresql"))]
fn connect_postgresql(_url: &str) -> Result<Backend> {
    Err(Error::invalid_connection_url(
        "`postgresql` feature not enabled",
    ))
}
