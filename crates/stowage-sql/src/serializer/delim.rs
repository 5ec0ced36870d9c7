use super::{Formatter, ToSql};

/// Comma delimited
pub(crate) struct Comma<L>(pub(crate) L);

/// `AND` delimited
pub(crate) struct And<L>(pub(crate) L);

impl<L> ToSql for Comma<L>
where
    L: IntoIterator,
    L::Item: ToSql,
{
    fn to_sql(self, f: &mut Formatter) {
        let mut s = "";
        for i in self.0 {
            fmt!(f, s i);
            s = ", ";
        }
    }
}

impl<L> ToSql for And<L>
where
    L: IntoIterator,
    L::Item: ToSql,
{
    fn to_sql(self, f: &mut Formatter) {
        let mut s = "";
        for i in self.0 {
            fmt!(f, s i);
            s = " AND ";
        }
    }
}
