use std::time::Duration;

/// Per-call query options carried by an interface handle.
///
/// Skip, limit and timeout are handed to the backend's native query options
/// and are advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub skip: u64,

    /// Maximum rows to return; `None` is unbounded.
    pub limit: Option<u64>,

    pub timeout: Option<Duration>,

    /// Read uncommitted data where the backend supports it.
    pub dirty_read: bool,

    /// Return only the number of matches.
    pub count_only: bool,
}
