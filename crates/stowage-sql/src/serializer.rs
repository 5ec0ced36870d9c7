#[macro_use]
mod fmt;
pub(crate) use fmt::ToSql;

mod delim;
pub(crate) use delim::{And, Comma};

mod ident;
pub(crate) use ident::{Ident, Qualified};

mod params;
pub(crate) use params::Bind;

use crate::{Flavor, Param, Statement};

/// Accumulates statement text and its parameters.
pub(crate) struct Formatter {
    pub(crate) flavor: Flavor,
    pub(crate) dst: String,
    pub(crate) params: Vec<Param>,
}

impl Formatter {
    pub(crate) fn new(flavor: Flavor) -> Formatter {
        Formatter {
            flavor,
            dst: String::new(),
            params: vec![],
        }
    }

    pub(crate) fn finish(self) -> Statement {
        let mut stmt = Statement::new(self.dst);
        stmt.params = self.params;
        stmt
    }
}
