//! Schema definition errors

use thiserror::Error;

/// Errors raised while building a schema or parsing store paths.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A collection or document path is malformed
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The mirror configuration names a field the schema does not declare
    #[error("Mirror configuration references undeclared field '{field}'")]
    MissingMirrorSource { field: String },
}

impl SchemaError {
    /// Check if this error is a path parsing failure
    pub fn is_path_error(&self) -> bool {
        matches!(self, SchemaError::InvalidPath { .. })
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
