//! Document Store Scenario Tests
//!
//! End-to-end behavior through the public `Database` API:
//! - Price range query over a collection with a unique sku index
//! - Updates and deletes of missing identifiers
//! - Soft-deleted documents hidden from reads
//! - Batch operations with partial failures

use aerodoc::index::{IndexKind, IndexOptions};
use aerodoc::query::{Filter, FindOptions, SortKey};
use aerodoc::store::{
    Database, DatabaseConfig, StoreErrorCode, UpdateOp, SOFT_DELETE_FIELD, UPDATED_AT_FIELD,
};
use aerodoc::value::{Document, Value};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(value: serde_json::Value) -> Document {
    Document::from_json(value).unwrap()
}

fn products() -> Database {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("products").unwrap();
    db.create_index(
        "products",
        vec!["sku".into()],
        IndexKind::Unique,
        IndexOptions::default(),
    )
    .unwrap();
    db.create_index(
        "products",
        vec!["price".into()],
        IndexKind::Standard,
        IndexOptions::default(),
    )
    .unwrap();
    db
}

fn ids(docs: &[Document]) -> Vec<serde_json::Value> {
    docs.iter()
        .map(|d| d.id().map(Value::to_json).unwrap_or_default())
        .collect()
}

// =============================================================================
// Price Range With Unique Sku
// =============================================================================

#[test]
fn test_price_range_sorted_with_unique_sku() {
    let db = products();
    for (id, sku, price) in [("a", "S1", 5), ("b", "S2", 15), ("c", "S3", 25), ("d", "S4", 12)] {
        db.insert("products", doc(json!({"_id": id, "sku": sku, "price": price})))
            .unwrap();
    }

    let err = db
        .insert("products", doc(json!({"_id": "e", "sku": "S2", "price": 99})))
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::AeroDuplicateKey);
    assert_eq!(db.count("products", &Filter::All).unwrap(), 4);

    let filter = Filter::and(vec![Filter::gte("price", 10), Filter::lte("price", 20)]);
    let found = db
        .find("products", filter, FindOptions::new().sort(SortKey::asc("price")))
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(ids(&found), vec![json!("d"), json!("b")]);
}

#[test]
fn test_unique_conflict_on_update_leaves_document_unchanged() {
    let db = products();
    db.insert("products", doc(json!({"_id": "a", "sku": "S1", "price": 1})))
        .unwrap();
    db.insert("products", doc(json!({"_id": "b", "sku": "S2", "price": 2})))
        .unwrap();

    let err = db
        .update(
            "products",
            &Value::from("b"),
            &[UpdateOp::set("price", 3), UpdateOp::set("sku", "S1")],
        )
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::AeroDuplicateKey);

    let b = db.get("products", &Value::from("b")).unwrap().unwrap();
    assert_eq!(b.get("price"), Some(&Value::Int(2)));
    assert!(b.get(UPDATED_AT_FIELD).is_none());
}

// =============================================================================
// Missing Identifiers
// =============================================================================

#[test]
fn test_update_missing_id_is_not_found() {
    let db = products();
    let err = db
        .update("products", &Value::from("ghost"), &[UpdateOp::set("price", 1)])
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::AeroNotFound);
    assert_eq!(db.count("products", &Filter::All).unwrap(), 0);
}

#[test]
fn test_delete_is_idempotent() {
    let db = products();
    db.insert("products", doc(json!({"_id": 7, "sku": "S7"})))
        .unwrap();

    assert!(db.delete("products", &Value::Int(7)).unwrap());
    assert!(!db.delete("products", &Value::Int(7)).unwrap());
    assert!(!db.delete("products", &Value::Int(7)).unwrap());

    // the sku is free again
    db.insert("products", doc(json!({"_id": 8, "sku": "S7"})))
        .unwrap();
}

#[test]
fn test_integer_and_float_ids_collide() {
    let db = products();
    db.insert("products", doc(json!({"_id": 1, "sku": "A"}))).unwrap();
    let err = db
        .insert("products", doc(json!({"_id": 1.0, "sku": "B"})))
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::AeroDuplicateKey);
    assert!(db.get("products", &Value::Float(1.0)).unwrap().is_some());
}

// =============================================================================
// Soft Delete
// =============================================================================

#[test]
fn test_soft_deleted_documents_hidden_by_default() {
    let db = products();
    db.insert("products", doc(json!({"_id": "a", "sku": "A", "price": 1})))
        .unwrap();
    db.insert("products", doc(json!({"_id": "b", "sku": "B", "price": 2})))
        .unwrap();
    db.update("products", &Value::from("a"), &[UpdateOp::set(SOFT_DELETE_FIELD, true)])
        .unwrap();

    assert_eq!(db.count("products", &Filter::All).unwrap(), 1);
    let all = db
        .find("products", Filter::All, FindOptions::new().include_deleted(true))
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(all.len(), 2);

    // still reachable by id
    assert!(db.get("products", &Value::from("a")).unwrap().is_some());
}

// =============================================================================
// Batches
// =============================================================================

#[test]
fn test_insert_many_reports_each_failure() {
    let db = products();
    let result = db
        .insert_many(
            "products",
            vec![
                doc(json!({"_id": 1, "sku": "A"})),
                doc(json!({"_id": 2, "sku": "A"})),
                doc(json!({"_id": 1, "sku": "C"})),
                doc(json!({"_id": 3, "sku": "D"})),
            ],
        )
        .unwrap();

    assert!(!result.is_complete());
    assert_eq!(result.succeeded, vec![Value::Int(1), Value::Int(3)]);
    let failed: Vec<usize> = result.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2]);
}

#[test]
fn test_update_many_and_delete_many_use_find_semantics() {
    let db = products();
    for i in 0..6 {
        db.insert(
            "products",
            doc(json!({"_id": i, "sku": format!("S{}", i), "price": i * 10})),
        )
        .unwrap();
    }

    let updated = db
        .update_many("products", &Filter::gte("price", 30), &[UpdateOp::set("sale", true)])
        .unwrap();
    assert_eq!(updated.succeeded.len(), 3);
    assert_eq!(db.count("products", &Filter::eq("sale", true)).unwrap(), 3);

    let deleted = db.delete_many("products", &Filter::eq("sale", true)).unwrap();
    assert!(deleted.is_complete());
    assert_eq!(db.count("products", &Filter::All).unwrap(), 3);
}

#[test]
fn test_unknown_collection() {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    let err = db.insert("nowhere", Document::new()).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::AeroUnknownCollection);
}
