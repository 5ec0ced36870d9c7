use super::Error;

/// Error when a row is read from a cursor that is no longer open.
#[derive(Debug)]
pub(super) struct CursorExhaustedError;

impl std::error::Error for CursorExhaustedError {}

impl core::fmt::Display for CursorExhaustedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("cursor exhausted")
    }
}

impl Error {
    /// Creates a cursor exhausted error.
    pub fn cursor_exhausted() -> Error {
        Error::from(super::ErrorKind::CursorExhausted(CursorExhaustedError))
    }

    /// Returns `true` if this error is a cursor exhausted error.
    pub fn is_cursor_exhausted(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::CursorExhausted(_)))
    }
}
