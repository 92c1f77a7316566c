//! Callback access to the document inside a commit attempt.

use crate::document::{Action, FieldError, check_not_protected, check_writable};
use crate::store::Snapshot;
use crate::value::{Fields, Value};

use super::state::TransactionState;

/// Handle passed to each transaction callback.
///
/// Callbacks run after the document has been read inside the transaction,
/// so [`CallbackContext::get`] sees the stored data with this run's queued
/// edits applied. Edits made here are queued for the same attempt; they are
/// never added to the document's own queue.
///
/// ```
/// # use std::sync::Arc;
/// use stagedoc::{CollectionPath, Document, InMemoryStore, Schema, fields};
///
/// let store = Arc::new(InMemoryStore::new());
/// let schema = Arc::new(
///     Schema::new(CollectionPath::new("counters").unwrap())
///         .with_defaults(fields([("hits", 0.into())])),
/// );
/// let mut doc = Document::new(store, schema, "home").unwrap();
/// doc.attach(|ctx| {
///     let hits = ctx.get("hits").and_then(|v| v.as_int()).unwrap_or(0);
///     ctx.set("hits", hits + 1)?;
///     Ok(())
/// });
/// ```
pub struct CallbackContext<'a> {
    state: &'a mut TransactionState,
}

impl<'a> CallbackContext<'a> {
    pub(crate) fn new(state: &'a mut TransactionState) -> Self {
        Self { state }
    }

    pub fn id(&self) -> &str {
        self.state.path().id()
    }

    /// True if the document was found by the read preceding the callbacks
    pub fn exists(&self) -> bool {
        self.state.exists()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.state.snap()
    }

    /// Current value of `field`, or `None` if it is absent or deleted.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.state.raw().get(field).filter(|v| !v.is_deleted())
    }

    pub fn data(&self) -> &Fields {
        self.state.raw()
    }

    /// Sets a declared field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        check_writable(self.state.raw(), field)?;
        let mut change = Fields::new();
        change.insert(field.to_string(), value.into());
        self.state.record(Action::Update(change));
        Ok(())
    }

    /// Sets several declared fields at once; nothing is queued if any is rejected.
    pub fn update(&mut self, data: Fields) -> Result<(), FieldError> {
        for field in data.keys() {
            check_writable(self.state.raw(), field)?;
        }
        self.state.record(Action::Update(data));
        Ok(())
    }

    pub fn delete_field(&mut self, field: &str) -> Result<(), FieldError> {
        check_writable(self.state.raw(), field)?;
        self.state.record(Action::DeleteField(field.to_string()));
        Ok(())
    }

    /// Replaces the whole document with `data`.
    pub fn create(&mut self, data: Fields) -> Result<(), FieldError> {
        check_not_protected(data.keys())?;
        self.state.record(Action::Create(data));
        Ok(())
    }

    /// Deletes the document instead of writing it.
    pub fn delete(&mut self) {
        self.state.record(Action::Delete);
    }
}
