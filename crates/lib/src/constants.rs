//! Constants used throughout the stagedoc library
//!
//! This module contains the reserved field names managed by the store and
//! the default run configuration values.

/// Creation time of a document, stamped by the store on create.
pub const CREATED_AT: &str = "_createdAt";

/// Last update time of a document, stamped by the store on every write.
pub const UPDATED_AT: &str = "_updatedAt";

/// Schema version the document was written with.
pub const SCHEMA_VERSION: &str = "_v";

/// All base fields. These are read-only through the document view.
pub const BASE_FIELDS: [&str; 3] = [CREATED_AT, UPDATED_AT, SCHEMA_VERSION];

/// Default bound on transaction attempts when neither the schema nor the run overrides it.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Returns true if `field` is one of the store-managed base fields.
pub fn is_base_field(field: &str) -> bool {
    BASE_FIELDS.contains(&field)
}
