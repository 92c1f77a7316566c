//! Create tests
//!
//! Soft creates (`find_or_create`) only write missing documents; creates
//! replace the stored document unconditionally.

use stagedoc::{RunStatus, Value, fields};

use crate::helpers::*;

#[tokio::test]
async fn test_find_or_create_writes_missing_document() {
    let ctx = TestContext::new();
    let mut doc = ctx.doc("u1");

    doc.find_or_create(fields([("name", "Ada".into()), ("handle", "ada".into())]))
        .unwrap();
    doc.run().await.unwrap();

    let creates = creates_to(&ctx.ops(), &user_path("u1"));
    assert_eq!(
        creates,
        vec![fields([
            ("name", "Ada".into()),
            ("age", 0.into()),
            ("handle", "ada".into()),
            ("city", Value::Null),
            ("_createdAt", Value::ServerTimestamp),
            ("_updatedAt", Value::ServerTimestamp),
            ("_v", 1.into()),
        ])]
    );
    assert_eq!(doc.last_run_status(), Some(RunStatus::Created));
    assert!(doc.actions_run().create);
    assert!(doc.exists());

    let stored = ctx.stored(&user_path("u1")).unwrap();
    assert!(matches!(stored["_createdAt"], Value::Timestamp(_)));
}

#[tokio::test]
async fn test_find_or_create_adopts_existing_document() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc("u1");

    doc.find_or_create(fields([("name", "Imposter".into())]))
        .unwrap();
    doc.run().await.unwrap();

    assert!(ctx.store().writes().is_empty());
    assert_eq!(doc.data().get("name").unwrap(), "Ada");
    assert_eq!(doc.data().get("city").unwrap(), "London");
    assert_eq!(doc.last_run_status(), None);
    assert!(doc.exists());
    assert_eq!(ctx.stored(&user_path("u1")).unwrap(), ada());
}

#[tokio::test]
async fn test_create_replaces_existing_document() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc("u1");

    doc.create(fields([("name", "Bob".into()), ("handle", "bob".into())]))
        .unwrap();
    doc.run().await.unwrap();

    // No read is needed to overwrite
    assert_eq!(reads(&ctx.ops()), 0);
    let stored = ctx.stored(&user_path("u1")).unwrap();
    assert_eq!(stored["name"], "Bob");
    assert_eq!(stored["city"], Value::Null);
    assert_eq!(doc.last_run_status(), Some(RunStatus::ForceCreated));
    assert!(doc.actions_run().force_create);
}

#[tokio::test]
async fn test_create_sends_deleted_fields_as_markers() {
    let ctx = TestContext::new()
        .with_schema(plain_schema())
        .with_user("u1", ada());
    let mut doc = ctx.doc("u1");

    doc.create(fields([("name", "Bob".into())])).unwrap();
    doc.delete_fields(["city"]).unwrap();
    doc.run().await.unwrap();

    let sets = sets_to(&ctx.ops(), &user_path("u1"));
    assert_eq!(sets[0].0["city"], Value::Deleted);
    assert!(!ctx.stored(&user_path("u1")).unwrap().contains_key("city"));
}

#[tokio::test]
async fn test_create_stamps_schema_version() {
    let ctx = TestContext::new().with_schema(plain_schema().with_version(3));
    let mut doc = ctx.doc("u1");

    doc.create(fields([("name", "Ada".into())])).unwrap();
    doc.run().await.unwrap();

    assert_eq!(ctx.stored(&user_path("u1")).unwrap()["_v"], 3);
}
