//! Test context for managing test setup.
//!
//! Provides a composable `TestContext` that explicitly shows what each test needs:
//! a store, a schema, and documents bound to both.

use std::sync::Arc;

use stagedoc::{DocumentPath, Document, Fields, InMemoryStore, Schema, StoreOperation};

use crate::helpers::{user_path, user_schema};

/// Store and schema shared by the documents of one test.
///
/// Use the builder methods to set up what the test needs:
/// - `TestContext::new()` - in-memory store with the mirrored, validated user schema
/// - `.with_schema(schema)` - swaps the schema
/// - `.with_user(id, data)` - seeds a stored user document
pub struct TestContext {
    store: Arc<InMemoryStore>,
    schema: Arc<Schema>,
}

impl TestContext {
    /// Create a new test context.
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            schema: Arc::new(user_schema()),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    /// Seed a user document directly in the store, bypassing the operation log.
    pub fn with_user(self, id: &str, data: Fields) -> Self {
        self.store.insert(user_path(id), data);
        self
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Handle on user `id`, starting from the schema defaults.
    pub fn doc(&self, id: &str) -> Document {
        Document::new(self.store.clone(), self.schema.clone(), id).unwrap()
    }

    /// Handle on user `id` whose local data already matches `data`.
    pub fn doc_with(&self, id: &str, data: Fields) -> Document {
        Document::with_data(self.store.clone(), self.schema.clone(), id, data).unwrap()
    }

    /// Stored data of `path`
    pub fn stored(&self, path: &DocumentPath) -> Option<Fields> {
        self.store.document(path)
    }

    pub fn ops(&self) -> Vec<StoreOperation> {
        self.store.operations()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
