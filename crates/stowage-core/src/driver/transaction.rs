use crate::{Error, Result};

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    CursorStability,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Returns the ANSI SQL name. Cursor stability has no ANSI spelling and
    /// maps to read committed.
    pub fn sql_name(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted | IsolationLevel::CursorStability => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Process-unique identity of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn next() -> TransactionId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TransactionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// A step a backend executes to open or close one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOp {
    Begin(IsolationLevel),
    Savepoint(u32),
    Release(u32),
    RollbackTo(u32),
    Commit,
    Rollback,
}

impl ScopeOp {
    /// Generic statement text; relational dialects may refine `Begin`.
    pub fn sql(&self) -> String {
        match self {
            ScopeOp::Begin(_) => "BEGIN".to_string(),
            ScopeOp::Savepoint(n) => format!("SAVEPOINT stowage_{n}"),
            ScopeOp::Release(n) => format!("RELEASE SAVEPOINT stowage_{n}"),
            ScopeOp::RollbackTo(n) => format!("ROLLBACK TO SAVEPOINT stowage_{n}"),
            ScopeOp::Commit => "COMMIT".to_string(),
            ScopeOp::Rollback => "ROLLBACK".to_string(),
        }
    }
}

/// Stack of open scopes on one connection.
///
/// The bottom scope is either a transaction started through
/// [`start_transaction`](Self::start_transaction) or an implicit one opened by
/// a single save or destroy. Every scope opened while a transaction is bound
/// becomes a savepoint, so a failing call only unwinds its own work.
#[derive(Debug, Default)]
pub struct NestingTracker {
    transaction: Option<TransactionId>,
    depth: u32,
}

impl NestingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The transaction currently bound to the connection.
    pub fn transaction(&self) -> Option<TransactionId> {
        self.transaction
    }

    /// Binds `id` to the connection. Returns `None` if it is already bound.
    pub fn start_transaction(
        &mut self,
        id: TransactionId,
        isolation: IsolationLevel,
    ) -> Result<Option<ScopeOp>> {
        match self.transaction {
            Some(current) if current == id => Ok(None),
            Some(current) => Err(Error::transaction_mismatch(format!(
                "connection is bound to {current}, cannot start {id}"
            ))),
            None if self.depth > 0 => Err(Error::transaction_mismatch(format!(
                "connection has an open scope, cannot start {id}"
            ))),
            None => {
                self.transaction = Some(id);
                self.depth = 1;
                Ok(Some(ScopeOp::Begin(isolation)))
            }
        }
    }

    /// Opens the scope of one save or destroy issued under `caller`.
    pub fn enter(&mut self, caller: Option<TransactionId>) -> Result<ScopeOp> {
        match (self.transaction, caller) {
            (None, None) if self.depth == 0 => {
                self.depth = 1;
                Ok(ScopeOp::Begin(IsolationLevel::default()))
            }
            (Some(current), Some(caller)) if current == caller => {
                let op = ScopeOp::Savepoint(self.depth);
                self.depth += 1;
                Ok(op)
            }
            (Some(current), Some(caller)) => Err(Error::transaction_mismatch(format!(
                "connection is bound to {current}, not {caller}"
            ))),
            (Some(current), None) => Err(Error::transaction_mismatch(format!(
                "connection is bound to {current}"
            ))),
            (None, Some(caller)) => Err(Error::transaction_mismatch(format!(
                "{caller} is not active on this connection"
            ))),
            (None, None) => Err(Error::transaction_mismatch(
                "connection has an open scope",
            )),
        }
    }

    /// Closes the innermost scope successfully.
    pub fn leave(&mut self) -> ScopeOp {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            ScopeOp::Commit
        } else {
            ScopeOp::Release(self.depth)
        }
    }

    /// Abandons the innermost scope.
    pub fn abort(&mut self) -> ScopeOp {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            ScopeOp::Rollback
        } else {
            ScopeOp::RollbackTo(self.depth)
        }
    }

    /// Commits the bound transaction and unbinds it.
    pub fn end_transaction(&mut self, id: TransactionId) -> Result<ScopeOp> {
        self.finish(id)?;
        Ok(ScopeOp::Commit)
    }

    /// Rolls back the bound transaction and unbinds it.
    pub fn rollback_transaction(&mut self, id: TransactionId) -> Result<ScopeOp> {
        self.finish(id)?;
        Ok(ScopeOp::Rollback)
    }

    fn finish(&mut self, id: TransactionId) -> Result<()> {
        match self.transaction {
            Some(current) if current == id => {
                self.transaction = None;
                self.depth = 0;
                Ok(())
            }
            Some(current) => Err(Error::transaction_mismatch(format!(
                "connection is bound to {current}, not {id}"
            ))),
            None => Err(Error::transaction_mismatch(format!(
                "{id} is not active on this connection"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_scope() {
        let mut tracker = NestingTracker::new();
        assert_eq!(
            tracker.enter(None).unwrap(),
            ScopeOp::Begin(IsolationLevel::ReadCommitted)
        );
        assert_eq!(tracker.leave(), ScopeOp::Commit);
        assert_eq!(tracker.depth(), 0);

        tracker.enter(None).unwrap();
        assert_eq!(tracker.abort(), ScopeOp::Rollback);
    }

    #[test]
    fn savepoints_inside_transaction() {
        let mut tracker = NestingTracker::new();
        let tx = TransactionId::next();

        assert_eq!(
            tracker.start_transaction(tx, IsolationLevel::Serializable).unwrap(),
            Some(ScopeOp::Begin(IsolationLevel::Serializable))
        );
        assert_eq!(tracker.start_transaction(tx, IsolationLevel::Serializable).unwrap(), None);

        assert_eq!(tracker.enter(Some(tx)).unwrap(), ScopeOp::Savepoint(1));
        assert_eq!(tracker.enter(Some(tx)).unwrap(), ScopeOp::Savepoint(2));
        assert_eq!(tracker.abort(), ScopeOp::RollbackTo(2));
        assert_eq!(tracker.leave(), ScopeOp::Release(1));

        assert_eq!(tracker.end_transaction(tx).unwrap(), ScopeOp::Commit);
        assert_eq!(tracker.transaction(), None);
    }

    #[test]
    fn second_transaction_is_rejected() {
        let mut tracker = NestingTracker::new();
        let first = TransactionId::next();
        let second = TransactionId::next();

        tracker.start_transaction(first, IsolationLevel::default()).unwrap();
        assert!(tracker
            .start_transaction(second, IsolationLevel::default())
            .unwrap_err()
            .is_transaction_mismatch());
        assert!(tracker.enter(Some(second)).unwrap_err().is_transaction_mismatch());
        assert!(tracker.enter(None).unwrap_err().is_transaction_mismatch());
        assert!(tracker.end_transaction(second).unwrap_err().is_transaction_mismatch());

        assert_eq!(tracker.rollback_transaction(first).unwrap(), ScopeOp::Rollback);
        assert!(tracker.enter(Some(first)).unwrap_err().is_transaction_mismatch());
    }

    #[test]
    fn scope_sql() {
        assert_eq!(ScopeOp::Savepoint(3).sql(), "SAVEPOINT stowage_3");
        assert_eq!(ScopeOp::RollbackTo(1).sql(), "ROLLBACK TO SAVEPOINT stowage_1");
        assert_eq!(ScopeOp::Release(2).sql(), "RELEASE SAVEPOINT stowage_2");
    }
}
