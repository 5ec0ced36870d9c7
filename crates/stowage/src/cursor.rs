use stowage_core::{ObjectIdentity, Result};
use stowage_driver_mongodb::DocumentCursor;
use stowage_sql::{Row, SqlGenerator};

use bson::Document;

/// Lifecycle of a [`Cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Positioned on a row that can be retrieved.
    Open,
    /// Advanced past the last row.
    Exhausted,
    /// Never had a row, or only counts.
    Closed,
}

/// Forward iterator over the result of a query.
///
/// A cursor starts on its first row, or closed when there is none. Dropping
/// it releases whatever the backend holds for the result.
#[derive(Debug)]
pub struct Cursor {
    state: CursorState,
    pos: u64,
    count: u64,
    identity: Option<ObjectIdentity>,
    pub(crate) source: Source,
}

#[derive(Debug)]
pub(crate) enum Source {
    Count,
    Rows {
        generator: SqlGenerator,
        rows: std::vec::IntoIter<Row>,
        current: Option<Row>,
    },
    Documents {
        documents: DocumentCursor,
        current: Option<Document>,
    },
}

impl Cursor {
    pub(crate) fn count_only(count: u64) -> Cursor {
        Cursor {
            state: CursorState::Closed,
            pos: 0,
            count,
            identity: None,
            source: Source::Count,
        }
    }

    pub(crate) fn rows(generator: SqlGenerator, rows: Vec<Row>) -> Cursor {
        let mut rows = rows.into_iter();
        let current = rows.next();
        Cursor::start(Source::Rows {
            generator,
            rows,
            current,
        })
    }

    pub(crate) fn documents(mut documents: DocumentCursor) -> Result<Cursor> {
        let current = documents.next_document()?;
        Ok(Cursor::start(Source::Documents { documents, current }))
    }

    fn start(source: Source) -> Cursor {
        let open = match &source {
            Source::Count => false,
            Source::Rows { current, .. } => current.is_some(),
            Source::Documents { current, .. } => current.is_some(),
        };

        Cursor {
            state: if open {
                CursorState::Open
            } else {
                CursorState::Closed
            },
            pos: 0,
            count: open as u64,
            identity: None,
            source,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// True while positioned on a row.
    pub fn valid(&self) -> bool {
        self.state == CursorState::Open
    }

    pub fn eof(&self) -> bool {
        !self.valid()
    }

    /// Index of the current row, starting at 0.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Rows reached so far, or the number of matches for a count cursor.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Identity the document store assigned to the last retrieved object.
    pub fn object_identity(&self) -> Option<&ObjectIdentity> {
        self.identity.as_ref()
    }

    /// Moves to the next row. Does nothing unless the cursor is open.
    pub fn next(&mut self) -> Result<()> {
        if !self.valid() {
            return Ok(());
        }

        let more = match &mut self.source {
            Source::Count => false,
            Source::Rows { rows, current, .. } => {
                *current = rows.next();
                current.is_some()
            }
            Source::Documents { documents, current } => {
                *current = documents.next_document()?;
                current.is_some()
            }
        };

        self.identity = None;
        if more {
            self.pos += 1;
            self.count += 1;
        } else {
            self.state = CursorState::Exhausted;
        }
        Ok(())
    }

    pub(crate) fn set_identity(&mut self, identity: Option<ObjectIdentity>) {
        self.identity = identity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::{Object, ScalarMeta, Value};
    use stowage_sql::Flavor;

    fn generator() -> SqlGenerator {
        let object = Object::builder("Item")
            .key("id", ScalarMeta::i64())
            .build()
            .unwrap();
        SqlGenerator::new(Flavor::Sqlite, None, &object)
    }

    #[test]
    fn walks_rows_then_exhausts() {
        let rows = vec![vec![Value::I64(1)], vec![Value::I64(2)]];
        let mut cursor = Cursor::rows(generator(), rows);

        assert_eq!(cursor.state(), CursorState::Open);
        assert_eq!((cursor.pos(), cursor.count()), (0, 1));

        cursor.next().unwrap();
        assert!(cursor.valid());
        assert_eq!((cursor.pos(), cursor.count()), (1, 2));

        cursor.next().unwrap();
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(cursor.eof());
        assert_eq!(cursor.count(), 2);

        cursor.next().unwrap();
        assert_eq!(cursor.state(), CursorState::Exhausted);
    }

    #[test]
    fn empty_result_is_closed() {
        let cursor = Cursor::rows(generator(), vec![]);
        assert_eq!(cursor.state(), CursorState::Closed);
        assert_eq!(cursor.count(), 0);
    }

    #[test]
    fn count_cursor_has_no_rows() {
        let mut cursor = Cursor::count_only(42);
        assert_eq!(cursor.state(), CursorState::Closed);
        assert_eq!(cursor.count(), 42);
        cursor.next().unwrap();
        assert_eq!(cursor.count(), 42);
    }
}
