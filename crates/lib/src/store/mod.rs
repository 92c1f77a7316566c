//! Store client interface
//!
//! The document layer talks to the remote store through three traits:
//!
//! - [`Store`]: the client. Runs retryable transactions and serves plain reads.
//! - [`StoreTransaction`]: the live handle inside one transaction attempt.
//!   Reads happen immediately; writes are buffered and applied atomically
//!   when the attempt commits.
//! - [`TransactionBody`]: the work to perform in each attempt. The store
//!   calls it once per attempt, discarding everything a failed attempt did.
//!
//! [`InMemoryStore`] implements the client in process, with optimistic
//! concurrency and an operation log for inspection.

mod errors;
mod in_memory;
mod query;

use std::fmt::Debug;

use async_trait::async_trait;

pub use errors::StoreError;
pub use in_memory::{InMemoryStore, StoreOperation};
pub use query::{Clause, Op, Query};

use crate::Result;
use crate::path::DocumentPath;
use crate::value::{Fields, Value};

/// Result of reading one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: DocumentPath,
    data: Option<Fields>,
}

impl Snapshot {
    pub fn found(path: DocumentPath, data: Fields) -> Self {
        Self {
            path,
            data: Some(data),
        }
    }

    pub fn missing(path: DocumentPath) -> Self {
        Self { path, data: None }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Fields> {
        self.data.as_ref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(field))
    }
}

/// Options for [`StoreTransaction::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into the existing document instead of replacing it
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Options for [`Store::run_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
}

/// Live handle to the store inside one transaction attempt.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a document; the read participates in the commit's conflict check.
    async fn get(&mut self, path: &DocumentPath) -> Result<Snapshot>;

    /// Runs a query inside the transaction, returning at most `query.limit` hits.
    async fn query(&mut self, query: &Query) -> Result<Vec<Snapshot>>;

    /// Buffers a create. The commit fails if the document exists by then.
    fn create(&mut self, path: &DocumentPath, data: Fields) -> Result<()>;

    /// Buffers an overwrite, or a merge when `options.merge` is set.
    fn set(&mut self, path: &DocumentPath, data: Fields, options: SetOptions) -> Result<()>;

    /// Buffers a delete of the whole document.
    fn delete(&mut self, path: &DocumentPath) -> Result<()>;
}

/// Work performed in each transaction attempt.
#[async_trait]
pub trait TransactionBody: Send {
    /// Runs one attempt. Any state kept from a previous attempt must be discarded.
    async fn attempt(&mut self, tx: &mut dyn StoreTransaction) -> Result<()>;
}

/// Client for a transactional document store.
#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Runs `body` in a transaction, re-running it on retryable conflicts up to
    /// `options.max_attempts` times. The last error is returned once attempts
    /// are exhausted.
    async fn run_transaction(
        &self,
        body: &mut dyn TransactionBody,
        options: TransactionOptions,
    ) -> Result<()>;

    /// Reads a document outside of any transaction.
    async fn get(&self, path: &DocumentPath) -> Result<Snapshot>;
}
