mod options;
pub use options::QueryOptions;

mod transaction;
pub use transaction::{IsolationLevel, NestingTracker, ScopeOp, TransactionId};
