use chrono::{DateTime, Utc};

/// Identifier a document store assigned to a stored object.
///
/// Kept apart from the object's own fields; it is never merged into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    /// Hex rendering of the store's identifier.
    pub id: String,

    /// Creation time embedded in the identifier.
    pub created: DateTime<Utc>,
}
