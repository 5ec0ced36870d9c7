use super::{within, Context, Scoped, Selection};
use crate::cursor::{Cursor, Source};

use stowage_core::driver::{NestingTracker, ScopeOp};
use stowage_core::{err, Error, Object, Result, Version};
use stowage_driver_mongodb::{document, from_bson, parse_filter, MongoDb};

/// A MongoDB client and the scopes open on it.
///
/// Documents are written one at a time, so nested scopes need no backend
/// work; only a bound transaction maps onto a driver session.
pub(super) struct DocumentStore {
    driver: MongoDb,
    tracker: NestingTracker,
}

impl DocumentStore {
    pub(super) fn connect(url: &str) -> Result<DocumentStore> {
        Ok(DocumentStore {
            driver: MongoDb::connect(url)?,
            tracker: NestingTracker::new(),
        })
    }

    pub(super) fn load(&mut self, cx: Context<'_>, object: &mut Object) -> Result<bool> {
        let Some(doc) = self.driver.find_by_key(cx.database, object)? else {
            return Ok(false);
        };

        object.clear();
        document::read(object, &doc)?;
        object.clear_modified();
        Ok(true)
    }

    pub(super) fn save(&mut self, cx: Context<'_>, object: &mut Object) -> Result<()> {
        let version = object.version()?;
        let next = object.next_version()?;

        let stored = within(self, cx.transaction, |this| match version {
            Version::Existing(current) => {
                let next = next.ok_or_else(|| err!("{} has no version field", object.type_name()))?;
                if this.driver.update_versioned(cx.database, object, current, next)? == 0 {
                    tracing::warn!(object = %object.describe_key(), version = current, "stale version");
                    return Err(Error::version_conflict(format!(
                        "{} is no longer at version {current}",
                        object.describe_key()
                    )));
                }
                Ok(Some(next))
            }
            Version::New => {
                this.driver.insert(cx.database, object, next)?;
                Ok(next)
            }
            // A failed write aborts a server transaction, so inside one the
            // key is looked up first instead of provoking the duplicate key error.
            Version::Unknown | Version::None if this.driver.in_transaction() => {
                if this.driver.find_by_key(cx.database, object)?.is_some() {
                    this.update_existing(cx, object)
                } else {
                    this.driver.insert(cx.database, object, next)?;
                    Ok(next)
                }
            }
            Version::Unknown | Version::None => match this.driver.insert(cx.database, object, next) {
                Ok(()) => Ok(next),
                Err(err) if err.is_unique_violation() => this.update_existing(cx, object),
                Err(err) => Err(err),
            },
        })?;

        if let Some(version) = stored {
            object.set_version(version)?;
        }
        object.clear_modified();
        Ok(())
    }

    fn update_existing(&mut self, cx: Context<'_>, object: &Object) -> Result<Option<i64>> {
        tracing::info!(object = %object.describe_key(), "key exists; updating instead");
        let doc = self
            .driver
            .update_existing(cx.database, object)?
            .ok_or_else(|| {
                Error::record_not_found(format!("{} vanished during update", object.describe_key()))
            })?;
        stored_version(object, &doc)
    }

    pub(super) fn destroy(&mut self, cx: Context<'_>, object: &Object) -> Result<bool> {
        let version = object.version()?;

        within(self, cx.transaction, |this| {
            let expected = match version {
                Version::Existing(current) => Some(current),
                _ => None,
            };
            if this.driver.delete(cx.database, object, expected)? > 0 {
                return Ok(true);
            }

            if let Some(current) = expected {
                tracing::warn!(object = %object.describe_key(), version = current, "stale version");
                return Err(Error::version_conflict(format!(
                    "{} is no longer at version {current}",
                    object.describe_key()
                )));
            }
            Ok(false)
        })
    }

    pub(super) fn drop_all(&mut self, cx: Context<'_>, object: &Object) -> Result<()> {
        self.driver.drop_collection(cx.database, object)
    }

    pub(super) fn structure(&mut self, cx: Context<'_>, object: &Object) -> Result<()> {
        self.driver.create_index(cx.database, object)
    }

    pub(super) fn query(
        &mut self,
        cx: Context<'_>,
        object: &Object,
        selection: Selection<'_>,
    ) -> Result<Cursor> {
        let filter = match selection {
            Selection::Native(text) => parse_filter(text)?,
            Selection::Example => document::example_filter(object)?,
        };

        if cx.options.count_only {
            let count = self.driver.count(cx.database, object, filter, cx.options)?;
            return Ok(Cursor::count_only(count));
        }

        let documents = self.driver.find(cx.database, object, filter, cx.options)?;
        Cursor::documents(documents)
    }

    pub(super) fn begin_transaction(&mut self, op: ScopeOp) -> Result<()> {
        match op {
            ScopeOp::Begin(isolation) => self.driver.start_transaction(isolation),
            _ => Ok(()),
        }
    }

    pub(super) fn finish_transaction(&mut self, op: ScopeOp) -> Result<()> {
        match op {
            ScopeOp::Commit => self.driver.commit_transaction(),
            ScopeOp::Rollback => self.driver.abort_transaction(),
            _ => Ok(()),
        }
    }
}

impl Scoped for DocumentStore {
    fn tracker(&mut self) -> &mut NestingTracker {
        &mut self.tracker
    }

    fn apply(&mut self, _op: ScopeOp) -> Result<()> {
        Ok(())
    }
}

/// Loads the cursor's current document, keeping its store identity on the
/// cursor.
pub(super) fn retrieve(object: &mut Object, cursor: &mut Cursor) -> Result<()> {
    let Source::Documents { current, .. } = &cursor.source else {
        return Err(err!("cursor does not belong to a document connection"));
    };
    let doc = current.as_ref().ok_or_else(Error::cursor_exhausted)?;

    object.clear();
    let identity = document::read(object, doc)?;
    object.clear_modified();
    cursor.set_identity(identity);
    Ok(())
}

fn stored_version(object: &Object, doc: &bson::Document) -> Result<Option<i64>> {
    let Some(field) = object.version_field() else {
        return Ok(None);
    };
    let value = doc
        .get(field.name())
        .ok_or_else(|| err!("no version stored for {}", object.describe_key()))?;
    let version = from_bson(value, field.meta())?;
    version
        .as_i64()
        .map(Some)
        .ok_or_else(|| Error::type_conversion(version.clone(), "version"))
}
