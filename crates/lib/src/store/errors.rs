//! Store client errors
//!
//! These are raised by [`Store`](super::Store) implementations and reach the
//! caller unmodified, apart from the phase tag added when a read inside a
//! transaction fails.

use thiserror::Error;

/// Errors that can occur while talking to the store.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("Document not found: {path}")]
    NotFound { path: String },

    /// `create` targeted a document that already exists
    #[error("Document already exists: {path}")]
    AlreadyExists { path: String },

    /// A document read inside the transaction changed before commit
    #[error("Transaction conflict on {path}: document changed since it was read")]
    Conflict { path: String },

    /// The write payload cannot be applied
    #[error("Invalid write to {path}: {reason}")]
    InvalidWrite { path: String, reason: String },

    /// The store could not be reached or refused the request
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Check if the transaction primitive may re-run the body after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Check if this error indicates a document was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error indicates a create collided with an existing document
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    /// Get the document path if the error concerns a single document
    pub fn path(&self) -> Option<&str> {
        match self {
            StoreError::NotFound { path }
            | StoreError::AlreadyExists { path }
            | StoreError::Conflict { path }
            | StoreError::InvalidWrite { path, .. } => Some(path),
            StoreError::Unavailable { .. } => None,
        }
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
