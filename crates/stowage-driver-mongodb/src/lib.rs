pub mod document;
mod value;
pub use value::{from_bson, to_bson};

use bson::Document;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{
        CountOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReadConcern,
        ReturnDocument, TransactionOptions,
    },
    sync::{Client, ClientSession, Collection, Cursor},
    IndexModel,
};
use stowage_core::{
    driver::{IsolationLevel, QueryOptions},
    Error, Object, Result, Value,
};
use url::Url;

/// Server error code for a duplicate key.
const DUPLICATE_KEY: i32 = 11000;

/// Database used when the connection URL names none.
const DEFAULT_DATABASE: &str = "stowage";

/// Runs a MongoDB action, inside the active transaction if there is one.
macro_rules! run {
    ($session:expr, $action:expr) => {
        match $session {
            Some(session) => $action.session(session).run(),
            None => $action.run(),
        }
    };
}

/// A MongoDB client plus the session of the active transaction.
pub struct MongoDb {
    client: Client,
    database: String,
    session: Option<ClientSession>,
}

impl MongoDb {
    /// Connects using a `mongodb://` or `mongodb+srv://` URL. The URL path
    /// names the default database.
    pub fn connect(url: &str) -> Result<MongoDb> {
        let parsed = Url::parse(url)
            .map_err(|err| Error::invalid_connection_url(format!("{url}: {err}")))?;

        if !matches!(parsed.scheme(), "mongodb" | "mongodb+srv") {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `mongodb` scheme; url={url}"
            )));
        }

        let client = Client::with_uri_str(url).map_err(Error::connection_failed)?;
        let database = database_name(&parsed);

        tracing::info!(db.system = "mongodb", db.name = %database, "connected");
        Ok(MongoDb {
            client,
            database,
            session: None,
        })
    }

    /// Database named by the connection URL.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn in_transaction(&self) -> bool {
        self.session.is_some()
    }

    /// Fetches the document matching the object's key.
    pub fn find_by_key(&mut self, database: &str, object: &Object) -> Result<Option<Document>> {
        let collection = self.collection(database, object);
        let filter = document::key_filter(object)?;
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), filter = %filter, "find one");

        run!(self.session.as_mut(), collection.find_one(filter)).map_err(operation_error)
    }

    /// Inserts the object, storing `version` in place of its version field.
    pub fn insert(&mut self, database: &str, object: &Object, version: Option<i64>) -> Result<()> {
        let collection = self.collection(database, object);
        let doc = versioned_document(object, version)?;
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), document = %doc, "insert");

        run!(self.session.as_mut(), collection.insert_one(doc)).map_err(operation_error)?;
        Ok(())
    }

    /// Updates the stored document only if it is still at `current`.
    ///
    /// Returns the number of documents matched; 0 means the stored version
    /// moved on or the document is gone.
    pub fn update_versioned(
        &mut self,
        database: &str,
        object: &Object,
        current: i64,
        next: i64,
    ) -> Result<u64> {
        let collection = self.collection(database, object);

        let mut filter = document::key_filter(object)?;
        if let Some(field) = object.version_field() {
            filter.insert(field.name(), to_bson(&Value::I64(current), field.meta())?);
        }

        let mut update = Document::new();
        update.insert("$set", versioned_document(object, Some(next))?);
        unset_nulls(&mut update, object);
        tracing::debug!(
            db.system = "mongodb",
            db.collection = object.backend_name(),
            filter = %filter,
            update = %update,
            "update"
        );

        let result = run!(self.session.as_mut(), collection.update_one(filter, update))
            .map_err(operation_error)?;
        Ok(result.matched_count)
    }

    /// Overwrites the stored document with the same key, incrementing its
    /// version in place. Returns the document as stored afterwards.
    pub fn update_existing(&mut self, database: &str, object: &Object) -> Result<Option<Document>> {
        let collection = self.collection(database, object);
        let filter = document::key_filter(object)?;

        let mut set = document::to_document(object)?;
        let mut update = Document::new();
        if let Some(field) = object.version_field() {
            set.remove(field.name());
            let mut inc = Document::new();
            inc.insert(field.name(), 1_i32);
            update.insert("$inc", inc);
        }
        update.insert("$set", set);
        unset_nulls(&mut update, object);
        tracing::debug!(
            db.system = "mongodb",
            db.collection = object.backend_name(),
            filter = %filter,
            update = %update,
            "update existing"
        );

        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::After);

        run!(
            self.session.as_mut(),
            collection.find_one_and_update(filter, update).with_options(options.clone())
        )
        .map_err(operation_error)
    }

    /// Deletes by key, and by version when one is given.
    pub fn delete(&mut self, database: &str, object: &Object, version: Option<i64>) -> Result<u64> {
        let collection = self.collection(database, object);

        let mut filter = document::key_filter(object)?;
        if let (Some(field), Some(version)) = (object.version_field(), version) {
            filter.insert(field.name(), to_bson(&Value::I64(version), field.meta())?);
        }
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), filter = %filter, "delete");

        let result =
            run!(self.session.as_mut(), collection.delete_one(filter)).map_err(operation_error)?;
        Ok(result.deleted_count)
    }

    pub fn drop_collection(&mut self, database: &str, object: &Object) -> Result<()> {
        let collection = self.collection(database, object);
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), "drop collection");

        run!(self.session.as_mut(), collection.drop()).map_err(operation_error)
    }

    /// Creates the unique index over the key fields.
    pub fn create_index(&mut self, database: &str, object: &Object) -> Result<()> {
        let collection = self.collection(database, object);
        let keys = document::index_keys(object);
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), keys = %keys, "create index");

        let mut options = IndexOptions::default();
        options.unique = Some(true);
        let index = IndexModel::builder().keys(keys).options(options).build();

        run!(self.session.as_mut(), collection.create_index(index.clone()))
            .map_err(operation_error)?;
        Ok(())
    }

    /// Counts matching documents, honoring skip, limit and timeout.
    pub fn count(
        &mut self,
        database: &str,
        object: &Object,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<u64> {
        let collection = self.collection(database, object);
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), filter = %filter, "count");

        let mut count = CountOptions::default();
        count.skip = (options.skip > 0).then_some(options.skip);
        count.limit = options.limit;
        count.max_time = options.timeout;

        run!(
            self.session.as_mut(),
            collection.count_documents(filter.clone()).with_options(count.clone())
        )
        .map_err(operation_error)
    }

    /// Finds matching documents, ordered by key.
    ///
    /// Inside a transaction the results are read eagerly, since a session
    /// cursor needs the session for every batch.
    pub fn find(
        &mut self,
        database: &str,
        object: &Object,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<DocumentCursor> {
        let collection = self.collection(database, object);
        tracing::debug!(db.system = "mongodb", db.collection = object.backend_name(), filter = %filter, "find");

        let mut find = FindOptions::default();
        find.skip = (options.skip > 0).then_some(options.skip);
        find.limit = options
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        find.max_time = options.timeout;
        find.sort = Some(document::index_keys(object));

        match self.session.as_mut() {
            Some(session) => {
                let mut cursor = collection
                    .find(filter)
                    .with_options(find)
                    .session(&mut *session)
                    .run()
                    .map_err(operation_error)?;
                let documents = cursor
                    .iter(session)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(operation_error)?;
                Ok(DocumentCursor::buffered(documents))
            }
            None => {
                let cursor = collection
                    .find(filter)
                    .with_options(find)
                    .run()
                    .map_err(operation_error)?;
                Ok(DocumentCursor::live(cursor))
            }
        }
    }

    /// Starts a session transaction with the read concern matching
    /// `isolation`.
    pub fn start_transaction(&mut self, isolation: IsolationLevel) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::transaction_mismatch(
                "MongoDB session already has an active transaction",
            ));
        }

        let mut session = self
            .client
            .start_session()
            .run()
            .map_err(Error::connection_failed)?;

        let mut options = TransactionOptions::default();
        options.read_concern = Some(read_concern(isolation));
        session
            .start_transaction()
            .with_options(options)
            .run()
            .map_err(operation_error)?;

        tracing::debug!(db.system = "mongodb", ?isolation, "transaction started");
        self.session = Some(session);
        Ok(())
    }

    pub fn commit_transaction(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        tracing::debug!(db.system = "mongodb", "commit transaction");
        session.commit_transaction().run().map_err(operation_error)
    }

    pub fn abort_transaction(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        tracing::debug!(db.system = "mongodb", "abort transaction");
        session.abort_transaction().run().map_err(operation_error)
    }

    fn collection(&self, database: &str, object: &Object) -> Collection<Document> {
        let database = if database.is_empty() {
            &self.database
        } else {
            database
        };
        self.client
            .database(database)
            .collection(object.backend_name())
    }
}

impl core::fmt::Debug for MongoDb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MongoDb")
            .field("database", &self.database)
            .field("in_transaction", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

/// Documents returned by [`MongoDb::find`].
pub struct DocumentCursor {
    source: Source,
}

enum Source {
    Live(Cursor<Document>),
    Buffered(std::vec::IntoIter<Document>),
}

impl DocumentCursor {
    fn live(cursor: Cursor<Document>) -> DocumentCursor {
        DocumentCursor {
            source: Source::Live(cursor),
        }
    }

    fn buffered(documents: Vec<Document>) -> DocumentCursor {
        DocumentCursor {
            source: Source::Buffered(documents.into_iter()),
        }
    }

    pub fn next_document(&mut self) -> Result<Option<Document>> {
        match &mut self.source {
            Source::Live(cursor) => cursor.next().transpose().map_err(operation_error),
            Source::Buffered(documents) => Ok(documents.next()),
        }
    }
}

impl core::fmt::Debug for DocumentCursor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let source = match self.source {
            Source::Live(_) => "live",
            Source::Buffered(_) => "buffered",
        };
        f.debug_struct("DocumentCursor")
            .field("source", &source)
            .finish()
    }
}

/// Parses backend-native query text, a JSON filter document. Empty text
/// matches everything.
pub fn parse_filter(text: &str) -> Result<Document> {
    if text.trim().is_empty() {
        return Ok(Document::new());
    }
    let json: serde_json::Value = serde_json::from_str(text)?;
    bson::to_document(&json).map_err(Error::driver_operation_failed)
}

fn versioned_document(object: &Object, version: Option<i64>) -> Result<Document> {
    let mut doc = document::to_document(object)?;
    if let (Some(field), Some(version)) = (object.version_field(), version) {
        doc.insert(field.name(), to_bson(&Value::I64(version), field.meta())?);
    }
    Ok(doc)
}

fn unset_nulls(update: &mut Document, object: &Object) {
    let nulls = document::null_members(object);
    if nulls.is_empty() {
        return;
    }

    let mut unset = Document::new();
    for name in nulls {
        unset.insert(name, "");
    }
    update.insert("$unset", unset);
}

fn read_concern(isolation: IsolationLevel) -> ReadConcern {
    match isolation {
        IsolationLevel::ReadUncommitted => ReadConcern::local(),
        IsolationLevel::ReadCommitted => ReadConcern::majority(),
        // Transactions accept only local, majority and snapshot.
        IsolationLevel::CursorStability
        | IsolationLevel::RepeatableRead
        | IsolationLevel::Serializable => ReadConcern::snapshot(),
    }
}

fn database_name(url: &Url) -> String {
    let name = url.path().trim_start_matches('/');
    if name.is_empty() {
        DEFAULT_DATABASE.to_string()
    } else {
        name.to_string()
    }
}

/// Maps a driver error, flagging duplicate keys as uniqueness violations.
fn operation_error(err: mongodb::error::Error) -> Error {
    let failure = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) => {
            Some((failure.code, failure.message.clone()))
        }
        ErrorKind::Command(failure) => Some((failure.code, failure.message.clone())),
        _ => None,
    };

    match failure {
        Some((DUPLICATE_KEY, message)) => {
            Error::unique_violation(DUPLICATE_KEY.to_string(), message)
        }
        Some((code, message)) => Error::statement_failed(code.to_string(), message),
        None => Error::driver_operation_failed(err),
    }
}
