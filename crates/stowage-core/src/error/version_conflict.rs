use super::Error;

/// Error when an optimistic version check fails on save or destroy.
///
/// The stored row or document exists but carries a different version than the
/// object being written, meaning another writer got there first.
#[derive(Debug)]
pub(super) struct VersionConflictError {
    context: Box<str>,
}

impl std::error::Error for VersionConflictError {}

impl core::fmt::Display for VersionConflictError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "version conflict: {}", self.context)
    }
}

impl Error {
    /// Creates a version conflict error.
    pub fn version_conflict(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::VersionConflict(VersionConflictError {
            context: context.into().into(),
        }))
    }

    /// Returns `true` if this error is a version conflict.
    pub fn is_version_conflict(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::VersionConflict(_)))
    }
}
