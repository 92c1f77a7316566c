//! Read failure tests
//!
//! A store read that fails inside an attempt surfaces as a transaction error
//! tagged with the phase it happened in. Only conflicts are retried.

use stagedoc::{Error, Op, Phase, Query, StoreError};

use crate::helpers::*;

fn offline() -> StoreError {
    StoreError::Unavailable {
        reason: "offline".into(),
    }
}

#[tokio::test]
async fn test_get_failure_is_tagged_and_not_retried() {
    let ctx = TestContext::new().with_user("u1", ada());
    ctx.store().inject_read_failure(offline());
    let mut doc = ctx.doc("u1");

    doc.find();
    let err = doc.run().await.unwrap_err();

    let Error::Transaction(tx_err) = &err else {
        panic!("expected a transaction error, got {err:?}");
    };
    assert_eq!(tx_err.phase, Phase::Get);
    assert!(matches!(*tx_err.source, Error::Store(StoreError::Unavailable { .. })));
    assert!(!err.is_retryable());
    assert!(err.is_store_error());

    // One attempt, nothing written, intent kept for another run
    assert_eq!(reads(&ctx.ops()), 0);
    assert!(ctx.store().writes().is_empty());
    assert_eq!(doc.queue().len(), 1);
    assert!(!doc.exists());
    assert!(doc.actions_run().is_empty());

    doc.run().await.unwrap();
    assert!(doc.exists());
    assert_eq!(doc.data().get("name").unwrap(), "Ada");
}

#[tokio::test]
async fn test_query_failure_is_tagged_and_not_retried() {
    let ctx = TestContext::new().with_user("u7", ada());
    ctx.store().inject_read_failure(offline());
    let mut doc = ctx.doc("placeholder");

    doc.query(Query::new(users()).filter("handle", Op::Eq, "ada"));
    doc.data_mut().set("age", 40).unwrap();
    let err = doc.run().await.unwrap_err();

    let Error::Transaction(tx_err) = &err else {
        panic!("expected a transaction error, got {err:?}");
    };
    assert_eq!(tx_err.phase, Phase::Query);
    assert!(!err.is_retryable());
    assert_eq!(commits(&ctx.ops()), 0);
    assert_eq!(doc.queue().len(), 2);
    assert_eq!(doc.id(), "placeholder");
    assert_eq!(ctx.stored(&user_path("u7")).unwrap()["age"], 36);
}

#[tokio::test]
async fn test_conflicting_read_is_retried() {
    let ctx = TestContext::new().with_user("u1", ada());
    ctx.store().inject_read_failure(StoreError::Conflict {
        path: user_path("u1").to_string(),
    });
    let mut doc = ctx.doc("u1");

    doc.find();
    doc.run().await.unwrap();

    assert!(doc.exists());
    assert_eq!(reads(&ctx.ops()), 1);
    assert_eq!(commits(&ctx.ops()), 1);
}
