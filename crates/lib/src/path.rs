//! Store locations for collections and documents.
//!
//! A [`CollectionPath`] names a collection (`users`, or a nested
//! `orgs/acme/users`); a [`DocumentPath`] is a collection plus a document id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaError;

/// Path of a collection in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Creates a collection path, rejecting empty segments and odd nesting.
    pub fn new(path: impl Into<String>) -> Result<Self, SchemaError> {
        let path = path.into();
        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 == 0 {
            return Err(SchemaError::InvalidPath {
                path,
                reason: "collection paths have an odd number of non-empty segments".to_string(),
            });
        }
        Ok(Self(path))
    }

    /// Location of the document with `id` inside this collection.
    ///
    /// Ids are a single non-empty segment, so the path parses back to itself.
    pub fn doc(&self, id: impl Into<String>) -> Result<DocumentPath, SchemaError> {
        let id = id.into();
        if id.is_empty() || id.contains('/') {
            return Err(SchemaError::InvalidPath {
                path: format!("{self}/{id}"),
                reason: "document ids are a single non-empty segment".to_string(),
            });
        }
        Ok(DocumentPath::within(self.clone(), id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CollectionPath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionPath> for String {
    fn from(value: CollectionPath) -> Self {
        value.0
    }
}

/// Path of a single document: its collection plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    /// Pairs a collection with an id already known to be a valid segment.
    pub(crate) fn within(collection: CollectionPath, id: String) -> Self {
        Self { collection, id }
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl FromStr for DocumentPath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('/') {
            Some((collection, id)) if !id.is_empty() => {
                CollectionPath::new(collection)?.doc(id)
            }
            _ => Err(SchemaError::InvalidPath {
                path: s.to_string(),
                reason: "document paths end in a non-empty id segment".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentPath> for String {
    fn from(value: DocumentPath) -> Self {
        value.to_string()
    }
}
