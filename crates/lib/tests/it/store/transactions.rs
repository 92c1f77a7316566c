//! Transaction primitive tests

use std::time::Duration;

use async_trait::async_trait;
use stagedoc::{
    DocumentPath, Fields, InMemoryStore, Op, Query, Result, SetOptions, Store, StoreOperation,
    StoreTransaction, TransactionBody, TransactionOptions, Value, fields,
};

use crate::helpers::*;

/// Copies one field of `from` into `to`, reading `from` inside the transaction.
struct CopyField {
    from: DocumentPath,
    to: DocumentPath,
    field: &'static str,
}

#[async_trait]
impl TransactionBody for CopyField {
    async fn attempt(&mut self, tx: &mut dyn StoreTransaction) -> Result<()> {
        let snap = tx.get(&self.from).await?;
        let value = snap.get(self.field).cloned().unwrap_or(Value::Null);
        let mut data = Fields::new();
        data.insert(self.field.to_string(), value);
        tx.set(&self.to, data, SetOptions::merge())
    }
}

/// Creates every listed document or none of them.
struct CreateAll(Vec<DocumentPath>);

#[async_trait]
impl TransactionBody for CreateAll {
    async fn attempt(&mut self, tx: &mut dyn StoreTransaction) -> Result<()> {
        for path in &self.0 {
            tx.create(path, fields([("n", 1.into())]))?;
        }
        Ok(())
    }
}

fn once() -> TransactionOptions {
    TransactionOptions { max_attempts: 1 }
}

#[tokio::test]
async fn test_reads_inside_transaction_see_committed_data() {
    let store = InMemoryStore::new().with_retry_backoff(Duration::from_millis(1));
    store.insert(user_path("a"), ada());

    let mut body = CopyField {
        from: user_path("a"),
        to: user_path("b"),
        field: "city",
    };
    store.run_transaction(&mut body, once()).await.unwrap();

    assert_eq!(store.document(&user_path("b")).unwrap()["city"], "London");
    assert!(matches!(
        store.operations()[0],
        StoreOperation::Get {
            in_transaction: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_failed_create_applies_no_write() {
    let store = InMemoryStore::new();
    store.insert(user_path("b"), fields([("n", 0.into())]));

    let mut body = CreateAll(vec![user_path("a"), user_path("b")]);
    let err = store.run_transaction(&mut body, once()).await.unwrap_err();

    assert!(err.is_already_exists());
    assert!(store.document(&user_path("a")).is_none());
    assert_eq!(store.document(&user_path("b")).unwrap()["n"], 0);
}

#[tokio::test]
async fn test_plain_get_is_outside_transactions() {
    let store = InMemoryStore::new();
    store.insert(user_path("a"), ada());

    let snap = store.get(&user_path("a")).await.unwrap();
    assert!(snap.exists());
    assert_eq!(snap.id(), "a");
    assert_eq!(
        store.operations(),
        vec![StoreOperation::Get {
            path: user_path("a"),
            in_transaction: false,
        }]
    );

    let missing = store.get(&user_path("zz")).await.unwrap();
    assert!(!missing.exists());
    assert!(missing.data().is_none());
}

#[tokio::test]
async fn test_query_filters_by_collection_and_clauses() {
    let store = InMemoryStore::new();
    store.insert(user_path("a"), fields([("age", 20.into())]));
    store.insert(user_path("b"), fields([("age", 40.into())]));
    store.insert(handle_path("c"), fields([("age", 40.into())]));

    struct Adults(Vec<String>);

    #[async_trait]
    impl TransactionBody for Adults {
        async fn attempt(&mut self, tx: &mut dyn StoreTransaction) -> Result<()> {
            let hits = tx
                .query(&Query::new(users()).filter("age", Op::Ge, 30))
                .await?;
            self.0 = hits.iter().map(|s| s.id().to_string()).collect();
            Ok(())
        }
    }

    let mut body = Adults(Vec::new());
    store.run_transaction(&mut body, once()).await.unwrap();
    assert_eq!(body.0, vec!["b".to_string()]);
}
