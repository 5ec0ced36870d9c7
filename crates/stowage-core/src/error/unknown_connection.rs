use super::Error;

/// Error when the registry has no connection under the requested name.
#[derive(Debug)]
pub(super) struct UnknownConnectionError {
    name: Box<str>,
}

impl std::error::Error for UnknownConnectionError {}

impl core::fmt::Display for UnknownConnectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unknown connection: {}", self.name)
    }
}

impl Error {
    /// Creates an unknown connection error.
    pub fn unknown_connection(name: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnknownConnection(UnknownConnectionError {
            name: name.into().into(),
        }))
    }

    /// Returns `true` if this error is an unknown connection error.
    pub fn is_unknown_connection(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::UnknownConnection(_)))
    }
}
