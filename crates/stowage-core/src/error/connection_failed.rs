use super::Error;

/// Error when a backend cannot be reached or refuses the connection.
#[derive(Debug)]
pub(super) struct ConnectionFailedError {
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for ConnectionFailedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for ConnectionFailedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "connection failed: {}", self.inner)
    }
}

impl Error {
    /// Creates an error for a backend that could not be reached.
    pub fn connection_failed(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::ConnectionFailed(ConnectionFailedError {
            inner: Box::new(err),
        }))
    }

    /// Returns `true` if this error is a connection failure.
    pub fn is_connection_failed(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::ConnectionFailed(_)))
    }
}
