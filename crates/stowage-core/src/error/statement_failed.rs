use super::Error;

/// Error when the backend rejects a generated statement or document operation.
///
/// Carries the backend's own error code (SQLite extended result code, PostgreSQL
/// SQLSTATE, MongoDB server code) and message.
#[derive(Debug)]
pub(super) struct StatementFailedError {
    code: Box<str>,
    message: Box<str>,
    unique_violation: bool,
}

impl std::error::Error for StatementFailedError {}

impl core::fmt::Display for StatementFailedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "statement failed [{}]: {}", self.code, self.message)
    }
}

impl Error {
    /// Creates an error for a statement the backend rejected.
    pub fn statement_failed(code: impl Into<String>, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::StatementFailed(StatementFailedError {
            code: code.into().into(),
            message: message.into().into(),
            unique_violation: false,
        }))
    }

    /// Creates an error for a statement that violated a uniqueness constraint.
    pub fn unique_violation(code: impl Into<String>, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::StatementFailed(StatementFailedError {
            code: code.into().into(),
            message: message.into().into(),
            unique_violation: true,
        }))
    }

    /// Returns `true` if this error is a rejected statement.
    pub fn is_statement_failed(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::StatementFailed(_)))
    }

    /// Returns `true` if the backend reported a uniqueness violation.
    pub fn is_unique_violation(&self) -> bool {
        self.any(|kind| {
            matches!(kind, super::ErrorKind::StatementFailed(err) if err.unique_violation)
        })
    }

    /// Returns the backend error code of a rejected statement.
    pub fn statement_code(&self) -> Option<&str> {
        self.chain().find_map(|err| match err.kind() {
            super::ErrorKind::StatementFailed(err) => Some(&*err.code),
            _ => None,
        })
    }
}
