use super::{Formatter, ToSql};

/// A double-quoted identifier.
pub(crate) struct Ident<S>(pub(crate) S);

/// A table name, optionally qualified with a schema.
pub(crate) struct Qualified<'a>(pub(crate) Option<&'a str>, pub(crate) &'a str);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql(self, f: &mut Formatter) {
        f.dst.push('"');
        for c in self.0.as_ref().chars() {
            if c == '"' {
                f.dst.push('"');
            }
            f.dst.push(c);
        }
        f.dst.push('"');
    }
}

impl ToSql for Qualified<'_> {
    fn to_sql(self, f: &mut Formatter) {
        if let Some(schema) = self.0 {
            fmt!(f, Ident(schema) ".");
        }
        fmt!(f, Ident(self.1));
    }
}
