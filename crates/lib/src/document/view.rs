//! Field access to a document's local data
//!
//! [`DataView`] reads the local data; [`DataViewMut`] also writes through to
//! it and queues the matching action, so the next run persists the change.
//!
//! Base fields can be read but never written. Before the document has been
//! committed once, reading a base field that the store has not supplied
//! returns a locally generated fallback (a timestamp for the time fields and
//! the schema version).

use crate::constants::is_base_field;
use crate::value::{Fields, Value};

use super::action::Action;
use super::errors::FieldError;

/// Fails if any of `fields` is a base field.
pub(crate) fn check_not_protected<'a>(
    fields: impl IntoIterator<Item = &'a String>,
) -> Result<(), FieldError> {
    match fields.into_iter().find(|f| is_base_field(f)) {
        Some(field) => Err(FieldError::ProtectedField {
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

/// Fails if `field` is a base field or is not in the key set of `raw`.
pub(crate) fn check_writable(raw: &Fields, field: &str) -> Result<(), FieldError> {
    if is_base_field(field) {
        return Err(FieldError::ProtectedField {
            field: field.to_string(),
        });
    }
    if !raw.contains_key(field) {
        return Err(FieldError::UnknownField {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn lookup(raw: &Fields, fallback: Option<&Fields>, field: &str) -> Option<Value> {
    match raw.get(field) {
        Some(Value::Deleted) => None,
        Some(value) => Some(value.clone()),
        None if is_base_field(field) => fallback.and_then(|f| f.get(field)).cloned(),
        None => None,
    }
}

/// Read-only view of a document's fields.
#[derive(Debug, Clone, Copy)]
pub struct DataView<'a> {
    raw: &'a Fields,
    fallback: Option<&'a Fields>,
}

impl<'a> DataView<'a> {
    pub(crate) fn new(raw: &'a Fields, fallback: Option<&'a Fields>) -> Self {
        Self { raw, fallback }
    }

    /// Current value of `field`. Deleted fields read as `None`.
    pub fn get(&self, field: impl AsRef<str>) -> Option<Value> {
        lookup(self.raw, self.fallback, field.as_ref())
    }

    /// True if `field` is in the key set, even if it was deleted locally.
    pub fn contains(&self, field: impl AsRef<str>) -> bool {
        self.raw.contains_key(field.as_ref())
    }

    /// Field names in the key set
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.raw.keys().map(String::as_str)
    }

    /// Fields with a current value, skipping local deletions.
    pub fn to_fields(&self) -> Fields {
        self.raw
            .iter()
            .filter(|(_, v)| !v.is_deleted())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Writable view of a document's fields.
///
/// ```
/// # use std::sync::Arc;
/// use stagedoc::{CollectionPath, Document, InMemoryStore, Schema, fields};
///
/// let schema = Arc::new(
///     Schema::new(CollectionPath::new("users").unwrap())
///         .with_defaults(fields([("name", "".into()), ("age", 0.into())])),
/// );
/// let mut doc = Document::new(Arc::new(InMemoryStore::new()), schema, "ada").unwrap();
///
/// doc.data_mut().set("age", 36).unwrap();
/// assert_eq!(doc.data().get("age").unwrap(), 36);
/// assert_eq!(doc.queue().len(), 1);
///
/// assert!(doc.data_mut().set("email", "x").unwrap_err().is_unknown_field());
/// assert!(doc.data_mut().set("_createdAt", 0).unwrap_err().is_protected_field());
/// ```
#[derive(Debug)]
pub struct DataViewMut<'a> {
    raw: &'a mut Fields,
    queue: &'a mut Vec<Action>,
    fallback: Option<&'a Fields>,
}

impl<'a> DataViewMut<'a> {
    pub(crate) fn new(
        raw: &'a mut Fields,
        queue: &'a mut Vec<Action>,
        fallback: Option<&'a Fields>,
    ) -> Self {
        Self {
            raw,
            queue,
            fallback,
        }
    }

    pub fn get(&self, field: impl AsRef<str>) -> Option<Value> {
        lookup(self.raw, self.fallback, field.as_ref())
    }

    /// Sets a field locally and queues an update for it.
    pub fn set(&mut self, field: impl AsRef<str>, value: impl Into<Value>) -> Result<(), FieldError> {
        let field = field.as_ref();
        check_writable(self.raw, field)?;
        let value = value.into();
        self.raw.insert(field.to_string(), value.clone());

        let mut change = Fields::new();
        change.insert(field.to_string(), value);
        self.queue.push(Action::Update(change));
        Ok(())
    }

    /// Marks a field deleted locally and queues its removal.
    ///
    /// The field keeps its slot in the key set, so it can be set again.
    pub fn delete(&mut self, field: impl AsRef<str>) -> Result<(), FieldError> {
        let field = field.as_ref();
        check_writable(self.raw, field)?;
        self.raw.insert(field.to_string(), Value::Deleted);
        self.queue.push(Action::DeleteField(field.to_string()));
        Ok(())
    }
}
