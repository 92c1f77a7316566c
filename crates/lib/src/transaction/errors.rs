//! Transaction specific errors
//!
//! Store failures raised inside a commit attempt are wrapped in a
//! [`TransactionError`] naming the phase that failed. Callback failures are
//! collected instead of thrown and surface together as
//! [`RunTransactionErrors`] once the commit has gone through.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by a transaction callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Step of a commit attempt that touched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Get,
    Query,
    Create,
    Update,
    Delete,
    Mirror,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Get => "get",
            Phase::Query => "query",
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
            Phase::Mirror => "mirror",
        };
        f.write_str(name)
    }
}

/// A store operation failed inside a commit attempt.
#[derive(Debug, Error)]
#[error("Transaction {phase} failed: {source}")]
pub struct TransactionError {
    pub phase: Phase,
    pub source: Box<crate::Error>,
}

impl TransactionError {
    pub fn new(phase: Phase, source: impl Into<crate::Error>) -> Self {
        Self {
            phase,
            source: Box::new(source.into()),
        }
    }

    /// Check if the underlying failure may succeed on another attempt
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    /// Check if the underlying failure is a missing document
    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

impl From<TransactionError> for crate::Error {
    fn from(err: TransactionError) -> Self {
        crate::Error::Transaction(err)
    }
}

/// One callback that returned an error during a commit attempt.
#[derive(Debug, Error)]
#[error("Callback #{index} failed: {source}")]
pub struct CallbackError {
    /// Position of the callback among the queued callbacks
    pub index: usize,
    pub source: BoxError,
}

/// Every callback failure of a run whose writes were still committed.
///
/// The document keeps its queue so the same intents can be submitted again.
#[derive(Debug, Error)]
#[error("{} transaction callback(s) failed: {}", .errors.len(), render_errors(.errors))]
pub struct RunTransactionErrors {
    pub errors: Vec<CallbackError>,
}

impl RunTransactionErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallbackError> {
        self.errors.iter()
    }
}

fn render_errors(errors: &[CallbackError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<RunTransactionErrors> for crate::Error {
    fn from(err: RunTransactionErrors) -> Self {
        crate::Error::Callbacks(err)
    }
}
