//! Transaction integration tests
//!
//! This module tests how `Document::run` turns a queue into store
//! operations: which write wins, what each payload holds, validation,
//! mirror replication, callbacks and retries on conflict.
//! Tests are organized by functional category for better maintainability.

mod create;
mod priority;
mod read_failures;
mod update;
