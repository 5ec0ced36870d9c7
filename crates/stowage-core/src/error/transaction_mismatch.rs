use super::Error;

/// Error when a connection is used by a transaction other than the one bound to it.
#[derive(Debug)]
pub(super) struct TransactionMismatchError {
    context: Box<str>,
}

impl std::error::Error for TransactionMismatchError {}

impl core::fmt::Display for TransactionMismatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "transaction mismatch: {}", self.context)
    }
}

impl Error {
    /// Creates a transaction mismatch error.
    pub fn transaction_mismatch(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::TransactionMismatch(
            TransactionMismatchError {
                context: context.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is a transaction mismatch.
    pub fn is_transaction_mismatch(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::TransactionMismatch(_)))
    }
}
