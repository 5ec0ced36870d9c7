mod connection;
pub use connection::{Connection, ConnectionKind};

mod connection_info;
pub use connection_info::ConnectionInformation;

pub mod cursor;
pub use cursor::{Cursor, CursorState};

mod interface;
pub use interface::Interface;

mod registry;
pub use registry::Registry;

pub mod transaction;
pub use transaction::{Transaction, TransactionState};

pub use stowage_core::driver::{IsolationLevel, QueryOptions};
pub use stowage_core::{
    bail, err, Element, Error, Field, Granularity, Member, Object, ObjectBuilder, ObjectIdentity,
    RepeatedGroup, Result, ScalarKind, ScalarMeta, Template, Value, Version,
};
