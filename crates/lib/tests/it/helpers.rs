//! Shared fixtures for the integration tests
//!
//! Schemas, seed data and helpers for picking apart the in-memory store's
//! operation log.

use stagedoc::{
    CollectionPath, DocumentPath, FieldKind, FieldRule, FieldRules, Fields, MirrorConfig, Schema,
    StoreOperation, Value, fields,
};

// Re-export tokio test macro for convenience
pub use tokio;

// Re-export TestContext for convenience
pub use crate::context::TestContext;

// ==========================
// SCHEMAS
// ==========================

pub fn users() -> CollectionPath {
    CollectionPath::new("users").unwrap()
}

pub fn handles() -> CollectionPath {
    CollectionPath::new("handles").unwrap()
}

pub fn user_path(id: &str) -> DocumentPath {
    users().doc(id).unwrap()
}

pub fn handle_path(id: &str) -> DocumentPath {
    handles().doc(id).unwrap()
}

/// Declared fields of the `users` collection
pub fn user_defaults() -> Fields {
    fields([
        ("name", "".into()),
        ("age", 0.into()),
        ("handle", "".into()),
        ("city", Value::Null),
    ])
}

pub fn user_rules() -> FieldRules {
    FieldRules::new()
        .field("name", FieldRule::new(FieldKind::Text).required())
        .field("age", FieldRule::new(FieldKind::Int))
        .field("handle", FieldRule::new(FieldKind::Text))
        .field("city", FieldRule::new(FieldKind::Text).nullable())
}

/// `users` schema without mirror or validator
pub fn plain_schema() -> Schema {
    Schema::new(users()).with_defaults(user_defaults())
}

/// `users` schema with validation and a mirror into `handles/{handle}`
pub fn user_schema() -> Schema {
    plain_schema()
        .with_validator(user_rules())
        .with_mirror(handle_mirror())
        .unwrap()
}

pub fn handle_mirror() -> MirrorConfig {
    MirrorConfig::new(handles(), "user", ["name", "age"]).with_id_field("handle")
}

/// A stored user document
pub fn ada() -> Fields {
    fields([
        ("name", "Ada".into()),
        ("age", 36.into()),
        ("handle", "ada".into()),
        ("city", "London".into()),
    ])
}

// ==========================
// OPERATION LOG HELPERS
// ==========================

/// Payload and merge flag of every `set` issued against `path`
pub fn sets_to(ops: &[StoreOperation], path: &DocumentPath) -> Vec<(Fields, bool)> {
    ops.iter()
        .filter_map(|op| match op {
            StoreOperation::Set { path: p, data, merge } if p == path => {
                Some((data.clone(), *merge))
            }
            _ => None,
        })
        .collect()
}

/// Payload of every `create` issued against `path`
pub fn creates_to(ops: &[StoreOperation], path: &DocumentPath) -> Vec<Fields> {
    ops.iter()
        .filter_map(|op| match op {
            StoreOperation::Create { path: p, data } if p == path => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// Number of reads, in or out of a transaction
pub fn reads(ops: &[StoreOperation]) -> usize {
    ops.iter().filter(|op| op.is_read()).count()
}

/// Number of commits that went through
pub fn commits(ops: &[StoreOperation]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, StoreOperation::Commit { .. }))
        .count()
}

/// Asserts `data` holds exactly the given user fields plus the update stamp
pub fn assert_update_payload(data: &Fields, expected: &[(&str, Value)]) {
    let mut wanted: Fields = expected
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    wanted.insert("_updatedAt".to_string(), Value::ServerTimestamp);
    assert_eq!(data, &wanted);
}
