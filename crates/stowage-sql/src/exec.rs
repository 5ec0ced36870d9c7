use crate::{Flavor, Statement};

use stowage_core::{Result, Value};

use std::time::Duration;

/// One returned row, decoded into values in select order.
pub type Row = Vec<Value>;

/// A relational driver: executes generated statements against one session.
pub trait Exec: Send {
    fn flavor(&self) -> Flavor;

    /// Runs statement text without parameters or results.
    fn batch(&mut self, sql: &str) -> Result<()>;

    /// Runs a statement, returning the number of affected rows.
    fn execute(&mut self, stmt: &Statement) -> Result<u64>;

    /// Runs a statement, decoding every row by `stmt.columns`.
    fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>>;

    /// Applies a statement timeout to subsequent statements.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match self.flavor().timeout_sql(timeout) {
            Some(sql) => self.batch(&sql),
            None => Ok(()),
        }
    }

    /// Allows or forbids reading uncommitted data.
    fn set_dirty_read(&mut self, enabled: bool) -> Result<()> {
        match self.flavor().dirty_read_sql(enabled) {
            Some(sql) => self.batch(&sql),
            None => Ok(()),
        }
    }
}
