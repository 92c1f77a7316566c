//! Update tests
//!
//! Updates merge only the touched fields into the stored document.

use stagedoc::{RunStatus, Value, fields};

use crate::helpers::*;

#[tokio::test]
async fn test_update_payload_holds_only_changed_fields() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc_with("u1", ada());

    doc.data_mut().set("age", 37).unwrap();
    doc.run().await.unwrap();

    let ops = ctx.ops();
    let sets = sets_to(&ops, &user_path("u1"));
    assert_eq!(sets.len(), 1);
    let (payload, merge) = &sets[0];
    assert!(*merge);
    assert_update_payload(payload, &[("age", 37.into())]);
    assert_eq!(reads(&ops), 0);
    assert_eq!(doc.last_run_status(), Some(RunStatus::Updated));

    let stored = ctx.stored(&user_path("u1")).unwrap();
    assert_eq!(stored["age"], 37);
    assert_eq!(stored["city"], "London");
    assert!(matches!(stored["_updatedAt"], Value::Timestamp(_)));
}

#[tokio::test]
async fn test_repeated_sets_collapse_to_last_value() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc_with("u1", ada());

    doc.data_mut().set("age", 37).unwrap();
    doc.update(fields([("age", 38.into()), ("city", "Paris".into())]))
        .unwrap();
    doc.run().await.unwrap();

    let sets = sets_to(&ctx.ops(), &user_path("u1"));
    assert_update_payload(&sets[0].0, &[("age", 38.into()), ("city", "Paris".into())]);
}

#[tokio::test]
async fn test_field_deletion_removes_stored_field() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc_with("u1", ada());

    doc.delete_fields(["city"]).unwrap();
    doc.run().await.unwrap();

    let sets = sets_to(&ctx.ops(), &user_path("u1"));
    assert_update_payload(&sets[0].0, &[("city", Value::Deleted)]);
    assert!(!ctx.stored(&user_path("u1")).unwrap().contains_key("city"));
    // The slot survives locally
    assert!(doc.data().contains("city"));
    assert_eq!(doc.data().get("city"), None);
}

#[tokio::test]
async fn test_server_timestamp_values_resolve_on_commit() {
    let ctx = TestContext::new()
        .with_schema(plain_schema().with_defaults(fields([("seen", Value::Null)])));
    let mut doc = ctx.doc("u1");

    doc.data_mut().set("seen", Value::ServerTimestamp).unwrap();
    doc.run().await.unwrap();

    let stored = ctx.stored(&user_path("u1")).unwrap();
    assert!(matches!(stored["seen"], Value::Timestamp(_)));
}
