use crate::{Connection, Interface};

use stowage_core::driver::TransactionId;
use stowage_core::{Granularity, Object, Result, ScalarMeta};

use chrono::{DateTime, Utc};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Table or collection audit records are written to.
pub const AUDIT_TABLE: &str = "stowage_audit";

/// Changes made through the interfaces of one transaction.
#[derive(Debug)]
pub(crate) struct Journal {
    transaction: TransactionId,
    enabled: AtomicBool,
    records: Mutex<Vec<Record>>,
}

/// One save or destroy, as it will be written at commit.
#[derive(Debug)]
pub(crate) struct Record {
    pub(crate) connection: Arc<Connection>,
    pub(crate) connection_name: String,
    pub(crate) database: String,
    pub(crate) time: DateTime<Utc>,
    pub(crate) object_type: String,
    pub(crate) object_key: String,
    pub(crate) destroy: bool,
    pub(crate) before: Option<serde_json::Value>,
    pub(crate) after: Option<serde_json::Value>,
}

impl Journal {
    pub(crate) fn new(transaction: TransactionId) -> Journal {
        Journal {
            transaction,
            enabled: AtomicBool::new(true),
            records: Mutex::new(vec![]),
        }
    }

    pub(crate) fn transaction(&self) -> TransactionId {
        self.transaction
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn record(
        &self,
        ifc: &Interface,
        object: &Object,
        before: Option<Object>,
        destroy: bool,
    ) {
        let record = Record {
            connection: ifc.shared_connection().clone(),
            connection_name: ifc.connection_name().to_string(),
            database: ifc.database().to_string(),
            time: Utc::now(),
            object_type: object.type_name().to_string(),
            object_key: object.describe_key(),
            destroy,
            before: before.map(|before| before.to_json()),
            after: (!destroy).then(|| object.to_json()),
        };

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Removes and returns the records made on `connection`.
    pub(crate) fn take_for(&self, connection: &Arc<Connection>) -> Vec<Record> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let (taken, kept) = records
            .drain(..)
            .partition(|record| Arc::ptr_eq(&record.connection, connection));
        *records = kept;
        taken
    }
}

/// An empty audit record object.
pub fn audit_object() -> Result<Object> {
    Object::builder("AuditRecord")
        .backend_name(AUDIT_TABLE)
        .key("id", ScalarMeta::text_max(36))
        .field("time", ScalarMeta::time(Granularity::Microsecond))
        .field("uid", ScalarMeta::text_max(64).nullable())
        .field("comment", ScalarMeta::text().nullable())
        .field("connection", ScalarMeta::text_max(64))
        .field("database", ScalarMeta::text_max(64).nullable())
        .field("object_type", ScalarMeta::text_max(128))
        .field("object_key", ScalarMeta::text())
        .field("destroy", ScalarMeta::boolean())
        .field("before", ScalarMeta::text().nullable())
        .field("after", ScalarMeta::text().nullable())
        .build()
}

impl Record {
    /// The audit object written for this record.
    pub(crate) fn to_object(&self, uid: Option<&str>, comment: Option<&str>) -> Result<Object> {
        let mut object = audit_object()?;
        object.set("id", uuid::Uuid::new_v4().to_string())?;
        object.set("time", self.time)?;
        if let Some(uid) = uid {
            object.set("uid", uid)?;
        }
        if let Some(comment) = comment {
            object.set("comment", comment)?;
        }
        object.set("connection", self.connection_name.as_str())?;
        if !self.database.is_empty() {
            object.set("database", self.database.as_str())?;
        }
        object.set("object_type", self.object_type.as_str())?;
        object.set("object_key", self.object_key.as_str())?;
        object.set("destroy", self.destroy)?;
        if let Some(before) = &self.before {
            object.set("before", before.to_string())?;
        }
        if let Some(after) = &self.after {
            object.set("after", after.to_string())?;
        }
        Ok(object)
    }
}
