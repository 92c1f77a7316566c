//! Document integration tests
//!
//! This module tests the local side of a document: queueing intents, the
//! data view, run bookkeeping and JSON conversion.

mod field_access;
mod json;
