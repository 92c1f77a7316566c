//! Data view tests
//!
//! Reads and writes through `Document::data` / `Document::data_mut`,
//! including base field protection and the pre-commit fallback.

use stagedoc::{RunConfig, Value, fields};

use crate::helpers::*;

#[tokio::test]
async fn test_set_writes_through_and_queues_update() {
    let ctx = TestContext::new();
    let mut doc = ctx.doc("u1");

    doc.data_mut().set("name", "Ada").unwrap();
    doc.data_mut().set("age", 36).unwrap();

    assert_eq!(doc.data().get("name").unwrap(), "Ada");
    assert_eq!(doc.queue().len(), 2);
    // Nothing reaches the store before run
    assert!(ctx.ops().is_empty());
}

#[tokio::test]
async fn test_base_fields_are_read_only() {
    let ctx = TestContext::new();
    let mut doc = ctx.doc("u1");

    for field in ["_createdAt", "_updatedAt", "_v"] {
        let err = doc.data_mut().set(field, 1).unwrap_err();
        assert!(err.is_protected_field(), "{field} should be protected");
        let err = doc.data_mut().delete(field).unwrap_err();
        assert!(err.is_protected_field());
    }

    let err = doc
        .update(fields([("name", "Ada".into()), ("_v", 9.into())]))
        .unwrap_err();
    assert!(err.is_protected_field());
    assert_eq!(err.module(), "document");
    assert!(doc.queue().is_empty());
    assert_eq!(doc.data().get("name").unwrap(), "");
}

#[tokio::test]
async fn test_unknown_fields_are_rejected() {
    let ctx = TestContext::new();
    let mut doc = ctx.doc("u1");

    assert!(doc.data_mut().set("email", "a@b.c").unwrap_err().is_unknown_field());
    assert!(doc.delete_fields(["email"]).unwrap_err().is_unknown_field());
    assert!(doc.queue().is_empty());
}

#[tokio::test]
async fn test_deleted_field_reads_empty_until_set_again() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc_with("u1", ada());

    doc.data_mut().delete("city").unwrap();
    assert_eq!(doc.data().get("city"), None);
    assert!(doc.data().contains("city"));

    doc.data_mut().set("city", "Paris").unwrap();
    assert_eq!(doc.data().get("city").unwrap(), "Paris");
}

#[tokio::test]
async fn test_base_fields_fall_back_until_first_successful_run() {
    let ctx = TestContext::new();
    let mut doc = ctx.doc("u1");

    assert!(matches!(doc.data().get("_createdAt"), Some(Value::Timestamp(_))));
    assert_eq!(doc.data().get("_v").unwrap(), 1);

    doc.find_or_create(fields([("name", "Ada".into())])).unwrap();
    doc.run().await.unwrap();

    // Committed, but the store's values were never read back
    assert!(doc.has_run_successfully());
    assert_eq!(doc.data().get("_createdAt"), None);
}

#[tokio::test]
async fn test_force_get_reads_back_server_timestamps_after_create() {
    let ctx = TestContext::new();
    let mut doc = ctx.doc("u1");

    doc.find_or_create(fields([("name", "Ada".into())])).unwrap();
    doc.run_with(RunConfig::new().force_get(true)).await.unwrap();

    let stored = ctx.stored(&user_path("u1")).unwrap();
    assert_eq!(doc.data().get("_createdAt").as_ref(), stored.get("_createdAt"));
    assert!(matches!(doc.data().get("_updatedAt"), Some(Value::Timestamp(_))));
    assert_eq!(doc.data().get("_v").unwrap(), 1);
}
