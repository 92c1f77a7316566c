//! Document field errors
//!
//! Raised synchronously by the data view and the queueing methods when a
//! field cannot be written. Nothing is queued when one of these is returned.

use thiserror::Error;

/// Errors raised when reading or writing document fields.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The field is not part of the document's key set
    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    /// The field is managed by the store and cannot be written
    #[error("Field '{field}' is managed by the store and cannot be modified")]
    ProtectedField { field: String },
}

impl FieldError {
    /// Check if this error was raised for an undeclared field
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, FieldError::UnknownField { .. })
    }

    /// Check if this error was raised for a base field
    pub fn is_protected_field(&self) -> bool {
        matches!(self, FieldError::ProtectedField { .. })
    }

    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            FieldError::UnknownField { field } | FieldError::ProtectedField { field } => field,
        }
    }
}

impl From<FieldError> for crate::Error {
    fn from(err: FieldError) -> Self {
        crate::Error::Field(err)
    }
}
