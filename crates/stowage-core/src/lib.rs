mod error;
pub use error::{Error, IntoError};

pub mod driver;

pub mod meta;
pub use meta::{Granularity, ScalarKind, ScalarMeta};

pub mod object;
pub use object::{
    Element, Field, Member, Object, ObjectBuilder, ObjectIdentity, RepeatedGroup, Template, Version,
};

mod value;
pub use value::Value;

pub type Result<T, E = Error> = core::result::Result<T, E>;
