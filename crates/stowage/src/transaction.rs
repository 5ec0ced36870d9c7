mod audit;
pub use audit::{audit_object, AUDIT_TABLE};
pub(crate) use audit::Journal;

use crate::connection::Context;
use crate::{Connection, Interface, Registry};

use stowage_core::driver::{IsolationLevel, QueryOptions, TransactionId};
use stowage_core::{Error, Result};

use chrono::{DateTime, Utc};

use std::sync::Arc;

/// An atomic unit of work across one or more connections.
///
/// Each connection joins the first time an interface for it is requested
/// through [`db_ifc`](Self::db_ifc). Saves and destroys through those
/// interfaces run inside savepoints of the connection's transaction and are
/// recorded in the audit trail unless auditing is turned off.
///
/// A transaction dropped without [`commit`](Self::commit) is rolled back.
#[derive(Debug)]
pub struct Transaction<'r> {
    registry: &'r Registry,
    start_time: DateTime<Utc>,
    isolation: IsolationLevel,
    uid: Option<String>,
    comment: Option<String>,
    journal: Arc<Journal>,
    joined: Vec<Joined>,
    state: TransactionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// A connection taking part in the transaction.
#[derive(Debug)]
struct Joined {
    connection: Arc<Connection>,
    database: String,
    audit_ready: bool,
}

impl<'r> Transaction<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Transaction<'r> {
        let id = TransactionId::next();
        tracing::debug!(transaction = %id, "transaction created");

        Transaction {
            registry,
            start_time: Utc::now(),
            isolation: IsolationLevel::default(),
            uid: None,
            comment: None,
            journal: Arc::new(Journal::new(id)),
            joined: vec![],
            state: TransactionState::Active,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.journal.transaction()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Sets the isolation level connections begin with. Fails once a
    /// connection has joined.
    pub fn set_isolation(&mut self, isolation: IsolationLevel) -> Result<()> {
        if !self.joined.is_empty() {
            return Err(Error::transaction_mismatch(format!(
                "{} already started; isolation is fixed",
                self.id()
            )));
        }
        self.isolation = isolation;
        Ok(())
    }

    /// Actor written into audit records.
    pub fn set_uid(&mut self, uid: impl Into<String>) {
        self.uid = Some(uid.into());
    }

    /// Free text written into audit records.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Turns the audit trail on or off. It is on by default.
    pub fn set_audit(&mut self, enabled: bool) {
        self.journal.set_enabled(enabled);
    }

    pub fn audit(&self) -> bool {
        self.journal.enabled()
    }

    /// An interface for `connection_name` bound to this transaction.
    pub fn db_ifc(&mut self, connection_name: &str) -> Result<Interface> {
        self.ensure_active()?;

        let ifc = self.registry.get_db_ifc(connection_name)?;
        let connection = ifc.shared_connection();

        if !self
            .joined
            .iter()
            .any(|joined| Arc::ptr_eq(&joined.connection, connection))
        {
            let mut joined = Joined {
                connection: connection.clone(),
                database: ifc.database().to_string(),
                audit_ready: false,
            };
            if self.journal.enabled() {
                joined.prepare_audit()?;
            }
            connection.start_transaction(self.id(), self.isolation)?;
            self.joined.push(joined);
        }

        Ok(ifc.bound(self.journal.clone()))
    }

    /// Writes the audit trail and commits every joined connection.
    ///
    /// Audit records are written to every connection before the first one
    /// commits, so a failing audit write rolls everything back. The commits
    /// themselves run one connection at a time: if a later connection fails
    /// to commit, the ones already committed stay committed and the rest are
    /// rolled back. The error is returned either way.
    pub fn commit(mut self) -> Result<()> {
        self.ensure_active()?;
        self.finish(true)
    }

    pub fn rollback(mut self) -> Result<()> {
        self.ensure_active()?;
        self.finish(false)
    }

    fn finish(&mut self, commit: bool) -> Result<()> {
        let id = self.id();
        let mut joined = std::mem::take(&mut self.joined);

        let mut result = Ok(());
        if commit {
            for joined in &mut joined {
                if let Err(err) = self.write_audit(joined) {
                    result = Err(err);
                    break;
                }
            }
        }

        for joined in joined {
            let outcome = if commit && result.is_ok() {
                joined.connection.end_transaction(id)
            } else {
                joined.connection.rollback_transaction(id)
            };

            if let Err(err) = outcome {
                if commit && result.is_ok() {
                    if let Err(rollback) = joined.connection.rollback_transaction(id) {
                        tracing::warn!(transaction = %id, error = %rollback, "rollback failed");
                    }
                    result = Err(err);
                } else {
                    tracing::warn!(transaction = %id, error = %err, "rollback failed");
                }
            }
        }

        self.state = match (commit, &result) {
            (true, Ok(())) => TransactionState::Committed,
            _ => TransactionState::RolledBack,
        };
        tracing::debug!(transaction = %id, state = ?self.state, "transaction finished");
        result
    }

    fn write_audit(&self, joined: &mut Joined) -> Result<()> {
        let records = self.journal.take_for(&joined.connection);
        if records.is_empty() {
            return Ok(());
        }
        if !joined.audit_ready {
            joined.prepare_audit()?;
        }

        let options = QueryOptions::default();
        let cx = Context {
            database: &joined.database,
            options: &options,
            transaction: Some(self.id()),
        };

        for record in &records {
            let mut object = record.to_object(self.uid.as_deref(), self.comment.as_deref())?;
            joined.connection.save(cx, &mut object)?;
        }
        tracing::debug!(transaction = %self.id(), records = records.len(), "audit trail written");
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(Error::transaction_mismatch(format!(
                "{} is no longer active ({state:?})",
                self.id()
            ))),
        }
    }
}

impl Joined {
    fn prepare_audit(&mut self) -> Result<()> {
        let options = QueryOptions::default();
        let cx = Context {
            database: &self.database,
            options: &options,
            transaction: None,
        };
        self.connection.structure(cx, &audit_object()?)?;
        self.audit_ready = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            tracing::debug!(transaction = %self.id(), "dropped without commit; rolling back");
            if let Err(err) = self.finish(false) {
                tracing::warn!(transaction = %self.id(), error = %err, "rollback on drop failed");
            }
        }
    }
}
