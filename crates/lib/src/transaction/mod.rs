//! Transactional commit of a document's queued actions
//!
//! This module turns the intents queued on a [`Document`](crate::Document)
//! into store operations inside a single store transaction.
//!
//! # Attempts
//!
//! The store may run a transaction body several times when it detects a
//! conflicting concurrent write. Each attempt builds a fresh
//! [`TransactionState`] from the document's data and queue, so nothing one
//! attempt read, decided or queued leaks into the next. Only the state of the
//! attempt that committed is folded back into the document.
//!
//! # Decision order
//!
//! Within an attempt the queue is not replayed in order. A delete beats any
//! write, a query decides which document is targeted, callbacks run against a
//! fresh read, and exactly one primary write (create, overwrite or merge) is
//! issued. See the engine documentation for the full order.
//!
//! # Mirrors
//!
//! Schemas with a mirror get a second write in the same transaction, copying
//! the mirrored fields into another collection. See [`MirrorWrite`].

mod context;
pub(crate) mod engine;
pub mod errors;
mod mirror;
mod state;

pub use context::CallbackContext;
pub use errors::{BoxError, CallbackError, Phase, RunTransactionErrors, TransactionError};
pub use state::{ActionsRun, MirrorWrite, RunStatus, TransactionState};
