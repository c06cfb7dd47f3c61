//! Index Consistency Tests
//!
//! Tests for index invariants:
//! - A query answered through indexes returns exactly what a full scan returns
//! - The property holds after updates and deletes
//! - Unique indexes never admit two documents with the same key

use aerodoc::index::{IndexKind, IndexOptions};
use aerodoc::query::{Filter, FindOptions};
use aerodoc::store::{Database, DatabaseConfig, UpdateOp};
use aerodoc::value::{Document, Value};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn corpus() -> Vec<Document> {
    [
        json!({"_id": 1, "price": 1, "cat": "a", "tags": ["x", "y"]}),
        json!({"_id": 2, "price": 2.5, "cat": "b", "tags": "x"}),
        json!({"_id": 3, "price": "3", "cat": "a"}),
        json!({"_id": 4, "price": null, "cat": "b", "opt": 1}),
        json!({"_id": 5, "cat": "a", "opt": 2}),
        json!({"_id": 6, "price": [4, 5], "cat": "c", "tags": []}),
        json!({"_id": 7, "price": true, "cat": "c"}),
        json!({"_id": 8, "price": 10, "cat": "a", "nested": {"price": 3}}),
        json!({"_id": 9, "price": 2, "cat": "b", "tags": ["z"]}),
        json!({"_id": 10, "price": -1.5, "cat": "a", "opt": null}),
        json!({"_id": 11, "cat": "X", "price": []}),
        json!({"_id": 12, "cat": "X", "price": {"amount": 5}}),
    ]
    .into_iter()
    .map(|v| Document::from_json(v).unwrap())
    .collect()
}

/// The same documents twice: once behind indexes, once without any
fn setup() -> Database {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("indexed").unwrap();
    db.create_collection("plain").unwrap();

    let standard = |fields: Vec<&str>, options: IndexOptions| {
        db.create_index(
            "indexed",
            fields.into_iter().map(String::from).collect(),
            IndexKind::Standard,
            options,
        )
        .unwrap();
    };
    standard(vec!["price"], IndexOptions::default());
    standard(vec!["tags"], IndexOptions::default());
    standard(vec!["cat", "price"], IndexOptions::default());
    standard(vec!["opt"], IndexOptions::default().sparse());
    standard(vec!["nested.price"], IndexOptions::default());

    for doc in corpus() {
        db.insert("indexed", doc.clone()).unwrap();
        db.insert("plain", doc).unwrap();
    }
    db
}

fn filters() -> Vec<Filter> {
    vec![
        Filter::eq("price", 2),
        Filter::eq("price", 2.0),
        Filter::eq("price", Value::Null),
        Filter::eq("price", 4),
        Filter::gt("price", 1),
        Filter::gte("price", 2),
        Filter::lt("price", 3),
        Filter::and(vec![Filter::gte("price", 1), Filter::lte("price", 5)]),
        Filter::gt("price", "2"),
        Filter::is_in("price", vec![Value::Int(1), Value::from("3"), Value::Null]),
        Filter::ne("price", 2),
        Filter::not_in("price", vec![1, 10]),
        Filter::exists("price", true),
        Filter::exists("price", false),
        Filter::eq("tags", "x"),
        Filter::is_in("tags", vec!["y", "z"]),
        Filter::and(vec![Filter::eq("cat", "a"), Filter::gt("price", 0)]),
        Filter::or(vec![Filter::eq("cat", "c"), Filter::eq("opt", 2)]),
        Filter::eq("opt", Value::Null),
        Filter::eq("opt", 1),
        Filter::exists("opt", true),
        Filter::eq("nested.price", 3),
        Filter::negate(Filter::eq("cat", "a")),
        Filter::eq("price", true),
        Filter::eq("cat", "X"),
        Filter::and(vec![Filter::eq("cat", "X"), Filter::exists("price", true)]),
        Filter::is_in("cat", vec!["X", "c"]),
    ]
}

fn ids(db: &Database, collection: &str, filter: &Filter) -> Vec<serde_json::Value> {
    let mut ids: Vec<serde_json::Value> = db
        .find(collection, filter.clone(), FindOptions::new())
        .unwrap()
        .to_vec()
        .unwrap()
        .iter()
        .map(|d| d.id().unwrap().to_json())
        .collect();
    ids.sort_by_key(|v| v.to_string());
    ids
}

fn assert_consistent(db: &Database) {
    for filter in filters() {
        assert_eq!(
            ids(db, "indexed", &filter),
            ids(db, "plain", &filter),
            "indexed and scanned results differ for {:?}",
            filter
        );
        assert_eq!(
            db.count("indexed", &filter).unwrap(),
            db.count("plain", &filter).unwrap()
        );
    }
}

fn apply_both(db: &Database, id: i64, ops: &[UpdateOp]) {
    db.update("indexed", &Value::Int(id), ops).unwrap();
    db.update("plain", &Value::Int(id), ops).unwrap();
}

// =============================================================================
// Lookup Equals Scan
// =============================================================================

#[test]
fn test_lookup_matches_scan_after_inserts() {
    let db = setup();
    assert_consistent(&db);
}

#[test]
fn test_lookup_matches_scan_after_updates() {
    let db = setup();
    apply_both(&db, 1, &[UpdateOp::set("price", 7)]);
    apply_both(&db, 2, &[UpdateOp::unset("price"), UpdateOp::push("tags", "q")]);
    apply_both(&db, 5, &[UpdateOp::increment("price", 2)]);
    apply_both(&db, 6, &[UpdateOp::add_to_set("tags", "x")]);
    apply_both(&db, 4, &[UpdateOp::unset("opt")]);
    apply_both(&db, 8, &[UpdateOp::set("nested.price", 4)]);
    assert_consistent(&db);
}

#[test]
fn test_lookup_matches_scan_after_deletes() {
    let db = setup();
    for id in [1, 4, 9] {
        db.delete("indexed", &Value::Int(id)).unwrap();
        db.delete("plain", &Value::Int(id)).unwrap();
    }
    assert_consistent(&db);

    db.delete_many("indexed", &Filter::eq("cat", "a")).unwrap();
    db.delete_many("plain", &Filter::eq("cat", "a")).unwrap();
    assert_consistent(&db);
}

#[test]
fn test_index_created_after_data_is_consistent() {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("late").unwrap();
    db.create_collection("plain").unwrap();
    for doc in corpus() {
        db.insert("late", doc.clone()).unwrap();
        db.insert("plain", doc).unwrap();
    }
    db.create_index(
        "late",
        vec!["price".into()],
        IndexKind::Standard,
        IndexOptions::default(),
    )
    .unwrap();

    for filter in filters() {
        assert_eq!(ids(&db, "late", &filter), ids(&db, "plain", &filter));
    }
}

#[test]
fn test_sub_microsecond_timestamp_bounds() {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("indexed").unwrap();
    db.create_collection("plain").unwrap();
    db.create_index(
        "indexed",
        vec!["at".into()],
        IndexKind::Standard,
        IndexOptions::default(),
    )
    .unwrap();

    let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    for (id, offset) in [(1, 500), (2, 1000), (3, 1500), (4, 2999)] {
        let doc = Document::new()
            .with("_id", id)
            .with("at", t + ChronoDuration::nanoseconds(offset));
        db.insert("indexed", doc.clone()).unwrap();
        db.insert("plain", doc).unwrap();
    }

    let pivot = t + ChronoDuration::nanoseconds(1000);
    for filter in [
        Filter::gt("at", pivot),
        Filter::gte("at", pivot),
        Filter::lt("at", pivot),
        Filter::lte("at", pivot),
        Filter::eq("at", pivot),
    ] {
        assert_eq!(
            ids(&db, "indexed", &filter),
            ids(&db, "plain", &filter),
            "indexed and scanned results differ for {:?}",
            filter
        );
    }
    assert_eq!(ids(&db, "indexed", &Filter::gt("at", pivot)), vec![json!(3), json!(4)]);
}

// =============================================================================
// Uniqueness
// =============================================================================

#[test]
fn test_unique_index_rejects_existing_duplicates() {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("users").unwrap();
    db.insert("users", Document::new().with("email", "a@x")).unwrap();
    db.insert("users", Document::new().with("email", "a@x")).unwrap();

    assert!(db
        .create_index(
            "users",
            vec!["email".into()],
            IndexKind::Unique,
            IndexOptions::default()
        )
        .is_err());
    assert!(db.list_indexes("users").unwrap().is_empty());
}

#[test]
fn test_unique_keys_are_exact() {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("events").unwrap();
    for field in ["at", "serial"] {
        db.create_index(
            "events",
            vec![field.into()],
            IndexKind::Unique,
            IndexOptions::default(),
        )
        .unwrap();
    }

    let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let base = 1i64 << 53;
    for n in 0..3 {
        db.insert(
            "events",
            Document::new()
                .with("at", t + ChronoDuration::nanoseconds(n))
                .with("serial", base + n),
        )
        .unwrap();
    }
    assert_eq!(db.count("events", &Filter::All).unwrap(), 3);
    assert!(db
        .insert("events", Document::new().with("serial", base + 2))
        .is_err());
}

#[test]
fn test_unique_array_elements_are_keys() {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("users").unwrap();
    db.create_index(
        "users",
        vec!["emails".into()],
        IndexKind::Unique,
        IndexOptions::default(),
    )
    .unwrap();

    db.insert(
        "users",
        Document::from_json(json!({"_id": 1, "emails": ["a@x", "b@x"]})).unwrap(),
    )
    .unwrap();
    assert!(db
        .insert(
            "users",
            Document::from_json(json!({"_id": 2, "emails": ["c@x", "b@x"]})).unwrap()
        )
        .is_err());
    assert_eq!(db.count("users", &Filter::eq("emails", "b@x")).unwrap(), 1);
}
