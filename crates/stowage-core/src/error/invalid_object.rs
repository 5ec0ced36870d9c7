use super::Error;

/// Error when an object model is malformed or addressed by a member it does not have.
#[derive(Debug)]
pub(super) struct InvalidObjectError {
    message: Box<str>,
}

impl std::error::Error for InvalidObjectError {}

impl core::fmt::Display for InvalidObjectError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid object: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid object error.
    pub fn invalid_object(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidObject(InvalidObjectError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid object error.
    pub fn is_invalid_object(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidObject(_)))
    }
}
