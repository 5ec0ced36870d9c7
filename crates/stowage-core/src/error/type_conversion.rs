use super::Error;
use crate::Value;

/// Error when a value cannot be represented in, or parsed from, the target type.
#[derive(Debug)]
pub(super) struct TypeConversionError {
    from_type: &'static str,
    to_type: Box<str>,
}

impl std::error::Error for TypeConversionError {}

impl core::fmt::Display for TypeConversionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "cannot convert {} to {}", self.from_type, self.to_type)
    }
}

impl Error {
    /// Creates a type conversion error.
    pub fn type_conversion(value: Value, to_type: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::TypeConversion(TypeConversionError {
            from_type: value.ty_name(),
            to_type: to_type.into().into(),
        }))
    }

    /// Creates a type conversion error for a backend-native type name.
    pub fn native_conversion(from_type: &'static str, to_type: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::TypeConversion(TypeConversionError {
            from_type,
            to_type: to_type.into().into(),
        }))
    }

    /// Returns `true` if this error is a type conversion error.
    pub fn is_type_conversion(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::TypeConversion(_)))
    }
}
