use super::Error;

/// Error when a connection URL cannot be parsed or names an unsupported backend.
#[derive(Debug)]
pub(super) struct InvalidConnectionUrlError {
    message: Box<str>,
}

impl std::error::Error for InvalidConnectionUrlError {}

impl core::fmt::Display for InvalidConnectionUrlError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid connection URL: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid connection URL error.
    pub fn invalid_connection_url(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidConnectionUrl(
            InvalidConnectionUrlError {
                message: message.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an invalid connection URL error.
    pub fn is_invalid_connection_url(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidConnectionUrl(_)))
    }
}
