use crate::ColumnType;

use stowage_core::Value;

/// A bound parameter: the value plus the column type it is written into.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub ty: ColumnType,
}

/// Which layout table the rows returned by a statement belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Statement returns no rows.
    None,
    /// Rows of `layout.tables()[n]`; 0 is the outermost object.
    Table(usize),
    /// A single scalar, such as a count or a version.
    Scalar,
}

/// Generated statement text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
    /// Types of the returned columns, in select order.
    pub columns: Vec<ColumnType>,
    pub target: Target,
}

impl Statement {
    pub(crate) fn new(sql: String) -> Statement {
        Statement {
            sql,
            params: vec![],
            columns: vec![],
            target: Target::None,
        }
    }
}

impl core::fmt::Display for Statement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.sql)
    }
}
