use super::{Formatter, ToSql};
use crate::Param;

/// Appends a parameter and writes its placeholder.
pub(crate) struct Bind(pub(crate) Param);

impl ToSql for Bind {
    fn to_sql(self, f: &mut Formatter) {
        f.params.push(self.0);
        let placeholder = f.flavor.placeholder(f.params.len());
        f.dst.push_str(&placeholder);
    }
}
