//! JSON conversion tests

use stagedoc::{Document, Timestamp, Value, fields};

use crate::helpers::*;

#[tokio::test]
async fn test_to_json_wraps_store_types() {
    let ctx = TestContext::new().with_schema(plain_schema().with_defaults(fields([
        ("name", "".into()),
        ("born", Value::Null),
        ("manager", Value::Null),
    ])));
    let doc = ctx.doc_with(
        "u1",
        fields([
            ("name", "Ada".into()),
            ("born", Timestamp::new(1_700_000_000, 5).into()),
            ("manager", user_path("u2").into()),
        ]),
    );

    let json = doc.to_json();
    assert_eq!(json["name"], "Ada");
    assert_eq!(
        json["born"],
        serde_json::json!({
            "type": "timestamp",
            "data": { "seconds": 1_700_000_000, "nanoseconds": 5 },
        })
    );
    assert_eq!(
        json["manager"],
        serde_json::json!({ "type": "document", "data": "users/u2" })
    );

    let revived = Document::from_json(ctx.store().clone(), ctx.schema().clone(), "u1", &json).unwrap();
    assert_eq!(
        revived.data().get("born").unwrap(),
        Value::Timestamp(Timestamp::new(1_700_000_000, 5))
    );
    assert_eq!(revived.data().get("manager").unwrap(), Value::Reference(user_path("u2")));
}

#[tokio::test]
async fn test_to_json_skips_deleted_fields() {
    let ctx = TestContext::new().with_user("u1", ada());
    let mut doc = ctx.doc_with("u1", ada());
    doc.delete_fields(["city"]).unwrap();

    let json = doc.to_json();
    assert!(json.get("city").is_none());
    assert_eq!(json["age"], 36);
}

#[tokio::test]
async fn test_from_json_keeps_out_of_range_timestamp_as_map() {
    let ctx = TestContext::new().with_schema(
        plain_schema().with_defaults(fields([("name", "".into()), ("born", Value::Null)])),
    );
    let json = serde_json::json!({
        "name": "Ada",
        "born": {
            "type": "timestamp",
            "data": { "seconds": i64::MAX, "nanoseconds": 1_500_000_000u64 },
        },
    });

    let doc = Document::from_json(ctx.store().clone(), ctx.schema().clone(), "u1", &json).unwrap();
    assert!(matches!(doc.data().get("born"), Some(Value::Map(_))));
    assert_eq!(doc.data().get("name").unwrap(), "Ada");
}
