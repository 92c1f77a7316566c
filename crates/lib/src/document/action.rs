//! Queued document intents.

use std::fmt;
use std::sync::Arc;

use crate::store::Query;
use crate::transaction::{BoxError, CallbackContext};
use crate::value::Fields;

/// Function run inside the transaction after the document has been read.
///
/// Returning an error does not abort the transaction; see
/// [`RunTransactionErrors`](crate::transaction::RunTransactionErrors).
pub type Callback =
    Arc<dyn Fn(&mut CallbackContext<'_>) -> Result<(), BoxError> + Send + Sync>;

/// One queued intent against a document.
///
/// Actions are recorded in call order, but the commit engine does not replay
/// them in order: it decides one outcome per run from the whole queue.
#[derive(Clone)]
pub enum Action {
    /// Write the whole document, replacing whatever is stored
    Create(Fields),
    /// Write the whole document only if it does not exist yet
    FindOrCreate(Fields),
    /// Merge the given fields into the stored document
    Update(Fields),
    /// Remove one field from the stored document
    DeleteField(String),
    /// Delete the whole document
    Delete,
    /// Read the document
    Find,
    /// Resolve the document through a query; the first hit is adopted
    Query(Query),
    Callback(Callback),
}

impl Action {
    /// Short name of the action kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Create(_) => "create",
            Action::FindOrCreate(_) => "find_or_create",
            Action::Update(_) => "update",
            Action::DeleteField(_) => "delete_field",
            Action::Delete => "delete",
            Action::Find => "find",
            Action::Query(_) => "query",
            Action::Callback(_) => "callback",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create(data) => f.debug_tuple("Create").field(data).finish(),
            Action::FindOrCreate(data) => f.debug_tuple("FindOrCreate").field(data).finish(),
            Action::Update(data) => f.debug_tuple("Update").field(data).finish(),
            Action::DeleteField(field) => f.debug_tuple("DeleteField").field(field).finish(),
            Action::Delete => f.write_str("Delete"),
            Action::Find => f.write_str("Find"),
            Action::Query(query) => f.debug_tuple("Query").field(query).finish(),
            Action::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}
