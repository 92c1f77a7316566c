//! Collection schemas
//!
//! A [`Schema`] describes one collection: where it lives, the default value of
//! every declared field, the schema version stamped on new documents, the
//! optional mirror target, the run defaults, and the validator.
//!
//! Schemas are plain values built with chaining methods and shared between
//! documents behind an `Arc`.
//!
//! ```
//! use stagedoc::{CollectionPath, MirrorConfig, Schema, fields};
//!
//! let schema = Schema::new(CollectionPath::new("users").unwrap())
//!     .with_defaults(fields([("name", "".into()), ("handle", "".into())]))
//!     .with_mirror(MirrorConfig::new(
//!         CollectionPath::new("handles").unwrap(),
//!         "user",
//!         ["name"],
//!     ).with_id_field("handle"))
//!     .unwrap();
//! assert!(schema.mirror().is_some());
//! ```

mod config;
mod errors;
mod validator;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use config::{RunConfig, RunDefaults};
pub use errors::SchemaError;
pub use validator::{
    FieldKind, FieldRule, FieldRules, ValidationError, ValidationIssue, Validator,
};

use crate::constants::is_base_field;
use crate::path::CollectionPath;
use crate::value::Fields;

/// Replication of a field subset into a second document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    /// Collection holding the mirror documents
    pub collection: CollectionPath,
    /// Field whose value is the mirror document id. `None` uses the source document id.
    #[serde(default)]
    pub id_field: Option<String>,
    /// Key in the mirror document under which the copied fields are written
    pub name: String,
    /// Fields copied into the mirror
    pub fields: Vec<String>,
}

impl MirrorConfig {
    pub fn new<F: Into<String>>(
        collection: CollectionPath,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = F>,
    ) -> Self {
        Self {
            collection,
            id_field: None,
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }
}

/// Description of one collection.
#[derive(Debug, Clone)]
pub struct Schema {
    collection: CollectionPath,
    defaults: Fields,
    version: i64,
    mirror: Option<MirrorConfig>,
    run_defaults: RunDefaults,
    validator: Option<Arc<dyn Validator>>,
}

impl Schema {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            defaults: Fields::new(),
            version: 1,
            mirror: None,
            run_defaults: RunDefaults::default(),
            validator: None,
        }
    }

    /// Declares the schema's fields and their default values.
    ///
    /// Base fields are store-managed and are dropped from the defaults.
    pub fn with_defaults(mut self, defaults: Fields) -> Self {
        self.defaults = defaults
            .into_iter()
            .filter(|(k, _)| !is_base_field(k))
            .collect();
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Adds a mirror target. Every mirrored field (and the id field, if any)
    /// must already be declared through [`Schema::with_defaults`].
    pub fn with_mirror(mut self, mirror: MirrorConfig) -> Result<Self, SchemaError> {
        let declared = mirror
            .fields
            .iter()
            .chain(mirror.id_field.iter())
            .find(|f| !self.defaults.contains_key(f.as_str()));
        if let Some(field) = declared {
            return Err(SchemaError::MissingMirrorSource {
                field: field.clone(),
            });
        }
        self.mirror = Some(mirror);
        Ok(self)
    }

    pub fn with_run_defaults(mut self, run_defaults: RunDefaults) -> Self {
        self.run_defaults = run_defaults;
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn defaults(&self) -> &Fields {
        &self.defaults
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn mirror(&self) -> Option<&MirrorConfig> {
        self.mirror.as_ref()
    }

    pub fn run_defaults(&self) -> &RunDefaults {
        &self.run_defaults
    }

    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    /// Names of all declared fields, in key order.
    pub fn field_names(&self) -> Vec<String> {
        self.defaults.keys().cloned().collect()
    }
}
