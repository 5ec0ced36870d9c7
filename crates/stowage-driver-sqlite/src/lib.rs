mod value;

use rusqlite::{ffi, params_from_iter, Connection};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use stowage_core::{Error, Result};
use stowage_sql::{Exec, Flavor, Row, Statement};
use url::Url;

/// Busy wait applied when no timeout is configured.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A SQLite session.
#[derive(Debug)]
pub struct Sqlite {
    connection: Connection,
    path: Option<PathBuf>,
}

impl Sqlite {
    /// Opens the database named by a `sqlite:` URL. `sqlite::memory:` opens a
    /// private in-memory database.
    pub fn connect(url: &str) -> Result<Sqlite> {
        let parsed = Url::parse(url).map_err(|err| {
            Error::invalid_connection_url(format!("{url}: {err}"))
        })?;

        if parsed.scheme() != "sqlite" {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={url}"
            )));
        }

        match parsed.path() {
            ":memory:" => Sqlite::in_memory(),
            "" => Err(Error::invalid_connection_url(format!(
                "connection URL names no database file; url={url}"
            ))),
            path => Sqlite::open(path),
        }
    }

    pub fn in_memory() -> Result<Sqlite> {
        let connection = Connection::open_in_memory().map_err(Error::connection_failed)?;
        Sqlite::init(connection, None)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Sqlite> {
        let path = path.as_ref().to_path_buf();
        let connection = Connection::open(&path).map_err(Error::connection_failed)?;
        Sqlite::init(connection, Some(path))
    }

    /// File backing the database; `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(connection: Connection, path: Option<PathBuf>) -> Result<Sqlite> {
        connection
            .busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(Error::connection_failed)?;

        tracing::debug!(
            db.system = "sqlite",
            path = ?path,
            "opened database"
        );
        Ok(Sqlite { connection, path })
    }
}

impl Exec for Sqlite {
    fn flavor(&self) -> Flavor {
        Flavor::Sqlite
    }

    fn batch(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(db.system = "sqlite", db.statement = %sql, "executing batch");
        self.connection.execute_batch(sql).map_err(statement_error)
    }

    fn execute(&mut self, stmt: &Statement) -> Result<u64> {
        tracing::debug!(
            db.system = "sqlite",
            db.statement = %stmt.sql,
            params = stmt.params.len(),
            "executing statement"
        );

        let mut prepared = self
            .connection
            .prepare_cached(&stmt.sql)
            .map_err(statement_error)?;
        let count = prepared
            .execute(params_from_iter(stmt.params.iter().map(value::Bind)))
            .map_err(statement_error)?;
        Ok(count as u64)
    }

    fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        tracing::debug!(
            db.system = "sqlite",
            db.statement = %stmt.sql,
            params = stmt.params.len(),
            "executing query"
        );

        let mut prepared = self
            .connection
            .prepare_cached(&stmt.sql)
            .map_err(statement_error)?;
        let mut rows = prepared
            .query(params_from_iter(stmt.params.iter().map(value::Bind)))
            .map_err(statement_error)?;

        let mut out = vec![];
        while let Some(row) = rows.next().map_err(statement_error)? {
            let values = stmt
                .columns
                .iter()
                .enumerate()
                .map(|(index, ty)| value::load(row, index, *ty))
                .collect::<Result<Row>>()?;
            out.push(values);
        }

        tracing::trace!(rows = out.len(), "query returned");
        Ok(out)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.connection
            .busy_timeout(timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT))
            .map_err(Error::driver_operation_failed)
    }

    fn set_dirty_read(&mut self, enabled: bool) -> Result<()> {
        self.connection
            .pragma_update(None, "read_uncommitted", enabled)
            .map_err(statement_error)
    }
}

/// Maps a SQLite failure, flagging primary key and unique constraint
/// violations.
fn statement_error(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let code = failure.extended_code.to_string();
            let message = message.clone().unwrap_or_else(|| failure.to_string());

            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    Error::unique_violation(code, message)
                }
                _ => Error::statement_failed(code, message),
            }
        }
        _ => Error::driver_operation_failed(err),
    }
}
