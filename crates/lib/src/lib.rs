//!
//! stagedoc: staged, transactional writes for document stores.
//! This library lets an application stage intents against a local copy of a
//! document and commit them to the store in a single transaction.
//!
//! ## Core Concepts
//!
//! * **Documents (`document::Document`)**: A local handle on one stored document. It holds the document's data and a queue of intents (create, update, delete, find, query, callbacks).
//! * **Schemas (`schema::Schema`)**: Per-collection description: field defaults, schema version, validator, mirror target and run defaults.
//! * **Stores (`store::Store`)**: A pluggable client for a transactional document store. `store::InMemoryStore` implements it in process.
//! * **Transactions (`transaction`)**: The commit engine that turns a queue into at most one primary write per run, retried by the store on conflicts:
//!     * **Validation**: Create and update payloads are checked by the schema validator before anything is written.
//!     * **Mirrors**: A subset of fields can be replicated into a second collection in the same transaction.
//!     * **Callbacks**: Functions run inside the transaction after a fresh read, able to queue more edits.
//! * **Values (`value::Value`)**: Field values, including store-native timestamps and references, with a tagged JSON form.

pub mod clock;
pub mod constants;
pub mod document;
pub mod path;
pub mod schema;
pub mod store;
pub mod transaction;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use document::{Action, Callback, DataView, DataViewMut, Document, FieldError};
pub use path::{CollectionPath, DocumentPath};
pub use schema::{
    FieldKind, FieldRule, FieldRules, MirrorConfig, RunConfig, RunDefaults, Schema, SchemaError,
    ValidationError, ValidationIssue, Validator,
};
pub use store::{
    Clause, InMemoryStore, Op, Query, SetOptions, Snapshot, Store, StoreError, StoreOperation,
    StoreTransaction, TransactionBody, TransactionOptions,
};
pub use transaction::{
    ActionsRun, BoxError, CallbackContext, CallbackError, MirrorWrite, Phase, RunStatus,
    RunTransactionErrors, TransactionError,
};
pub use value::{Fields, Timestamp, Value, fields};

/// Result type used throughout the stagedoc library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the stagedoc library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured field errors from the document module
    #[error(transparent)]
    Field(document::FieldError),

    /// Validation failures from the schema validator
    #[error(transparent)]
    Validation(schema::ValidationError),

    /// Structured schema errors from the schema module
    #[error(transparent)]
    Schema(schema::SchemaError),

    /// Structured store errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Store failures wrapped with the commit phase they occurred in
    #[error(transparent)]
    Transaction(transaction::TransactionError),

    /// Callback failures of a run whose writes were committed
    #[error(transparent)]
    Callbacks(transaction::RunTransactionErrors),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Field(_) => "document",
            Error::Validation(_) | Error::Schema(_) => "schema",
            Error::Store(_) => "store",
            Error::Transaction(_) | Error::Callbacks(_) => "transaction",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if the store may succeed if the transaction is attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_retryable(),
            Error::Transaction(tx_err) => tx_err.is_retryable(),
            _ => false,
        }
    }

    /// Check if this error indicates a document was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_not_found(),
            Error::Transaction(tx_err) => tx_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a create hit an existing document.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_already_exists(),
            Error::Transaction(tx_err) => tx_err.source.is_already_exists(),
            _ => false,
        }
    }

    /// Check if this error is validation-related.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if a write targeted a base field.
    pub fn is_protected_field(&self) -> bool {
        match self {
            Error::Field(field_err) => field_err.is_protected_field(),
            _ => false,
        }
    }

    /// Check if a write targeted a field outside the document's key set.
    pub fn is_unknown_field(&self) -> bool {
        match self {
            Error::Field(field_err) => field_err.is_unknown_field(),
            _ => false,
        }
    }

    /// Check if transaction callbacks failed after the writes were committed.
    pub fn is_callback_error(&self) -> bool {
        matches!(self, Error::Callbacks(_))
    }

    /// Check if this error is store-related, directly or inside a transaction.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Transaction(_))
    }

    /// Check if this error is schema-related.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::Schema(_))
    }
}
