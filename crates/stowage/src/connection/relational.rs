use super::{within, Context, Scoped, Selection};
use crate::cursor::{Cursor, Source};

use stowage_core::driver::{NestingTracker, ScopeOp};
use stowage_core::{err, Error, Object, Result, Version};
use stowage_sql::{Exec, Filter, Flavor, Pass, SqlGenerator, Statement, Target};

/// Savepoint guarding the insert of an insert-or-update save.
const FALLBACK_SAVEPOINT: &str = "stowage_fallback";

/// A relational driver and the scopes open on its session.
pub(super) struct Relational {
    exec: Box<dyn Exec>,
    tracker: NestingTracker,
}

impl Relational {
    pub(super) fn new(exec: Box<dyn Exec>) -> Relational {
        Relational {
            exec,
            tracker: NestingTracker::new(),
        }
    }

    pub(super) fn flavor(&self) -> Flavor {
        self.exec.flavor()
    }

    pub(super) fn load(
        &mut self,
        schema: Option<&str>,
        cx: Context<'_>,
        object: &mut Object,
    ) -> Result<bool> {
        self.exec.set_timeout(cx.options.timeout)?;

        let mut generator = SqlGenerator::new(self.flavor(), schema, object);
        let stmt = generator.root_statement(Pass::Select, object)?;
        let Some(row) = self.exec.query(&stmt)?.into_iter().next() else {
            return Ok(false);
        };

        object.clear();
        generator.read_row(object, stmt.target, row)?;
        self.read_children(&mut generator, object)?;
        object.clear_modified();
        Ok(true)
    }

    pub(super) fn save(
        &mut self,
        schema: Option<&str>,
        cx: Context<'_>,
        object: &mut Object,
    ) -> Result<()> {
        let version = object.version()?;
        let next = object.next_version()?;
        let mut generator = SqlGenerator::new(self.flavor(), schema, object);

        let stored = within(self, cx.transaction, |this| {
            this.exec.set_timeout(cx.options.timeout)?;

            match version {
                Version::Existing(current) => {
                    generator.begin(Pass::Update, object)?;
                    let root = generator.next_statement()?;
                    if this.execute(&root)? == 0 {
                        tracing::warn!(object = %object.describe_key(), version = current, "stale version");
                        return Err(Error::version_conflict(format!(
                            "{} is no longer at version {current}",
                            object.describe_key()
                        )));
                    }
                    this.drain(&mut generator)?;
                    Ok(next)
                }
                Version::New => {
                    generator.begin(Pass::Insert, object)?;
                    this.drain(&mut generator)?;
                    Ok(next)
                }
                Version::Unknown | Version::None => {
                    this.insert_or_update(&mut generator, object, version, next)
                }
            }
        })?;

        if let Some(version) = stored {
            object.set_version(version)?;
        }
        object.clear_modified();
        Ok(())
    }

    /// Inserts, and on a duplicate key overwrites the stored row once.
    ///
    /// Returns the version the row holds afterwards.
    fn insert_or_update(
        &mut self,
        generator: &mut SqlGenerator,
        object: &Object,
        version: Version,
        next: Option<i64>,
    ) -> Result<Option<i64>> {
        generator.begin(Pass::Insert, object)?;
        let root = generator.next_statement()?;

        self.exec.batch(&format!("SAVEPOINT {FALLBACK_SAVEPOINT}"))?;
        match self.execute(&root) {
            Ok(_) => {
                self.exec
                    .batch(&format!("RELEASE SAVEPOINT {FALLBACK_SAVEPOINT}"))?;
                self.drain(generator)?;
                return Ok(next);
            }
            Err(err) if err.is_unique_violation() => {
                self.exec
                    .batch(&format!("ROLLBACK TO SAVEPOINT {FALLBACK_SAVEPOINT}"))?;
                self.exec
                    .batch(&format!("RELEASE SAVEPOINT {FALLBACK_SAVEPOINT}"))?;
            }
            Err(err) => {
                self.exec
                    .batch(&format!("ROLLBACK TO SAVEPOINT {FALLBACK_SAVEPOINT}"))?;
                return Err(err);
            }
        }

        tracing::info!(object = %object.describe_key(), "key exists; updating instead");
        generator.begin(Pass::Update, object)?;
        let root = generator.next_statement()?;
        if self.execute(&root)? == 0 {
            return Err(Error::record_not_found(format!(
                "{} vanished during update",
                object.describe_key()
            )));
        }
        self.drain(generator)?;

        if version == Version::None {
            return Ok(None);
        }

        let stmt = generator.version_statement(object)?;
        let stored = self
            .exec
            .query(&stmt)?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_i64())
            .ok_or_else(|| err!("no version stored for {}", object.describe_key()))?;
        Ok(Some(stored))
    }

    pub(super) fn destroy(
        &mut self,
        schema: Option<&str>,
        cx: Context<'_>,
        object: &Object,
    ) -> Result<bool> {
        let version = object.version()?;
        let mut generator = SqlGenerator::new(self.flavor(), schema, object);

        within(self, cx.transaction, |this| {
            this.exec.set_timeout(cx.options.timeout)?;

            generator.begin(Pass::Delete, object)?;
            let root = generator.next_statement()?;
            if this.execute(&root)? > 0 {
                this.drain(&mut generator)?;
                return Ok(true);
            }

            if let Version::Existing(current) = version {
                tracing::warn!(object = %object.describe_key(), version = current, "stale version");
                return Err(Error::version_conflict(format!(
                    "{} is no longer at version {current}",
                    object.describe_key()
                )));
            }
            Ok(false)
        })
    }

    pub(super) fn drop_all(&mut self, schema: Option<&str>, object: &Object) -> Result<()> {
        let mut generator = SqlGenerator::new(self.flavor(), schema, object);
        generator.begin(Pass::Drop, object)?;
        self.drain(&mut generator)
    }

    pub(super) fn structure(&mut self, schema: Option<&str>, object: &Object) -> Result<()> {
        let mut generator = SqlGenerator::new(self.flavor(), schema, object);
        if let Some(sql) = generator.schema_statement() {
            self.exec.batch(&sql)?;
        }
        generator.begin(Pass::Create, object)?;
        self.drain(&mut generator)
    }

    pub(super) fn query(
        &mut self,
        schema: Option<&str>,
        cx: Context<'_>,
        object: &Object,
        selection: Selection<'_>,
    ) -> Result<Cursor> {
        let generator = SqlGenerator::new(self.flavor(), schema, object);
        let filter = match selection {
            Selection::Native(text) => Filter::Text(text),
            Selection::Example => Filter::Example,
        };
        let stmt = generator.query_statement(object, filter, cx.options)?;

        self.exec.set_timeout(cx.options.timeout)?;
        if cx.options.dirty_read {
            self.exec.set_dirty_read(true)?;
        }
        let rows = self.exec.query(&stmt);
        if cx.options.dirty_read {
            if let Err(err) = self.exec.set_dirty_read(false) {
                if rows.is_err() {
                    tracing::warn!(error = %err, "restoring isolation after failed query failed");
                } else {
                    return Err(err);
                }
            }
        }
        let rows = rows?;

        if cx.options.count_only {
            let count = rows
                .first()
                .and_then(|row| row.first())
                .and_then(|value| value.as_u64())
                .ok_or_else(|| err!("count query returned no count"))?;
            return Ok(Cursor::count_only(count));
        }

        Ok(Cursor::rows(generator, rows))
    }

    /// Loads the cursor's current row, then the object's child tables.
    pub(super) fn retrieve(&mut self, object: &mut Object, cursor: &mut Cursor) -> Result<()> {
        let Source::Rows {
            generator, current, ..
        } = &mut cursor.source
        else {
            return Err(err!("cursor does not belong to a relational connection"));
        };
        let row = current.clone().ok_or_else(Error::cursor_exhausted)?;

        object.clear();
        generator.read_row(object, Target::Table(0), row)?;
        self.read_children(generator, object)?;
        object.clear_modified();
        Ok(())
    }

    fn read_children(&mut self, generator: &mut SqlGenerator, object: &mut Object) -> Result<()> {
        generator.begin_children(Pass::Select, object)?;
        while !generator.eof() {
            let stmt = generator.next_statement()?;
            for row in self.exec.query(&stmt)? {
                generator.read_row(object, stmt.target, row)?;
            }
        }
        Ok(())
    }

    /// Executes every pending statement of the generator's pass.
    fn drain(&mut self, generator: &mut SqlGenerator) -> Result<()> {
        while !generator.eof() {
            let stmt = generator.next_statement()?;
            self.execute(&stmt)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Statement) -> Result<u64> {
        self.exec.execute(stmt)
    }
}

impl Scoped for Relational {
    fn tracker(&mut self) -> &mut NestingTracker {
        &mut self.tracker
    }

    fn apply(&mut self, op: ScopeOp) -> Result<()> {
        let sql = self.flavor().scope_sql(&op);
        self.exec.batch(&sql)
    }
}
