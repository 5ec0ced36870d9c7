#[macro_use]
mod serializer;

mod exec;
pub use exec::{Exec, Row};

mod flavor;
pub use flavor::Flavor;

mod generator;
pub use generator::{Filter, Pass, SqlGenerator};

pub mod layout;
pub use layout::{Column, Layout, Table};

mod rows;

mod statement;
pub use statement::{Param, Statement, Target};

mod ty;
pub use ty::ColumnType;
