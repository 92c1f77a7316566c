//! Decision order tests
//!
//! Exactly one primary write is issued per run, chosen from the whole queue.

use stagedoc::{RunStatus, StoreOperation, fields};

use crate::helpers::*;

#[tokio::test]
async fn test_delete_beats_every_write() {
    let ctx = TestContext::new()
        .with_schema(plain_schema())
        .with_user("u1", ada());
    let mut doc = ctx.doc_with("u1", ada());

    doc.data_mut().set("age", 37).unwrap();
    doc.create(fields([("name", "Bob".into())])).unwrap();
    doc.find_or_create(fields([("name", "Eve".into())])).unwrap();
    doc.delete();
    doc.run().await.unwrap();

    let writes = ctx.store().writes();
    assert_eq!(writes.len(), 1);
    assert!(matches!(&writes[0], StoreOperation::Delete { path } if path == &user_path("u1")));
    assert!(ctx.stored(&user_path("u1")).is_none());
    assert_eq!(doc.last_run_status(), Some(RunStatus::Deleted));
    assert!(doc.actions_run().delete);
    assert!(!doc.exists());
}

#[tokio::test]
async fn test_create_beats_update() {
    let ctx = TestContext::new().with_schema(plain_schema());
    let mut doc = ctx.doc("u1");

    doc.data_mut().set("name", "Ada").unwrap();
    doc.create(fields([("age", 5.into())])).unwrap();
    doc.run().await.unwrap();

    let writes = ctx.store().writes();
    assert_eq!(writes.len(), 1);
    let sets = sets_to(&writes, &user_path("u1"));
    let (payload, merge) = &sets[0];
    assert!(!merge);
    assert_eq!(payload["name"], "Ada");
    assert_eq!(payload["age"], 5);
    assert_eq!(doc.last_run_status(), Some(RunStatus::ForceCreated));
}

#[tokio::test]
async fn test_soft_create_beats_update_for_missing_document() {
    let ctx = TestContext::new().with_schema(plain_schema());
    let mut doc = ctx.doc("u1");

    doc.find_or_create(fields([("name", "Ada".into())])).unwrap();
    doc.data_mut().set("age", 20).unwrap();
    doc.run().await.unwrap();

    let creates = creates_to(&ctx.ops(), &user_path("u1"));
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0]["age"], 20);
    assert!(sets_to(&ctx.ops(), &user_path("u1")).is_empty());
    assert_eq!(doc.last_run_status(), Some(RunStatus::Created));
}

#[tokio::test]
async fn test_find_alone_never_writes() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc("u1");

    doc.find().find();
    doc.run().await.unwrap();

    let ops = ctx.ops();
    assert_eq!(reads(&ops), 1);
    assert!(ctx.store().writes().is_empty());
    assert_eq!(doc.last_run_status(), None);
}
