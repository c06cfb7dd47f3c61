//! Snapshot Persistence Tests
//!
//! Tests for snapshot invariants:
//! - Save then load reproduces collections, documents and indexes
//! - Indexes are rebuilt and keep enforcing their constraints
//! - Any damaged byte rejects the file and leaves the database untouched

use std::fs;

use aerodoc::index::{IndexKind, IndexOptions};
use aerodoc::query::{Filter, FindOptions, SortKey};
use aerodoc::snapshot;
use aerodoc::store::{Database, DatabaseConfig, StoreErrorCode};
use aerodoc::value::{Document, Value};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn populated() -> Database {
    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("products").unwrap();
    db.create_collection("reviews").unwrap();
    db.create_index(
        "products",
        vec!["sku".into()],
        IndexKind::Unique,
        IndexOptions::default(),
    )
    .unwrap();
    db.create_index(
        "reviews",
        vec!["body".into()],
        IndexKind::Text,
        IndexOptions::default().named("body_text"),
    )
    .unwrap();

    for (id, sku, price) in [(1, "A", 9.5), (2, "B", 20.0), (3, "C", 4.25)] {
        db.insert(
            "products",
            Document::from_json(json!({"_id": id, "sku": sku, "price": price, "tags": ["x"]}))
                .unwrap(),
        )
        .unwrap();
    }
    db.insert(
        "reviews",
        Document::from_json(json!({"_id": "r1", "body": "sturdy and cheap", "at": {"n": 1}}))
            .unwrap(),
    )
    .unwrap();
    db.insert(
        "reviews",
        Document::new()
            .with("_id", "r2")
            .with("body", "cheap")
            .with("at", chrono::Utc::now()),
    )
    .unwrap();
    db
}

fn everything(db: &Database, collection: &str) -> Vec<Document> {
    db.find(collection, Filter::All, FindOptions::new().include_deleted(true))
        .unwrap()
        .to_vec()
        .unwrap()
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_save_and_load_reproduces_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.snap");
    let original = populated();
    original.save_snapshot(&path).unwrap();

    let restored = Database::new(DatabaseConfig::default()).unwrap();
    restored.load_snapshot(&path).unwrap();

    assert_eq!(restored.list_collections(), original.list_collections());
    for name in original.list_collections() {
        assert_eq!(everything(&restored, &name), everything(&original, &name));
        assert_eq!(
            restored.list_indexes(&name).unwrap(),
            original.list_indexes(&name).unwrap()
        );
    }
    assert_eq!(restored.metrics().snapshot().documents, 5);
}

#[test]
fn test_restored_indexes_are_live() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.snap");
    populated().save_snapshot(&path).unwrap();

    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.load_snapshot(&path).unwrap();

    let err = db
        .insert("products", Document::new().with("sku", "B"))
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::AeroDuplicateKey);

    let hits = db
        .find(
            "reviews",
            Filter::text("cheap sturdy"),
            FindOptions::new().text_score("score"),
        )
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(hits[0].id(), Some(&Value::from("r1")));
    assert_eq!(hits.len(), 2);

    let sorted = db
        .find("products", Filter::All, FindOptions::new().sort(SortKey::desc("price")))
        .unwrap()
        .to_vec()
        .unwrap();
    assert_eq!(sorted[0].id(), Some(&Value::Int(2)));
}

#[test]
fn test_load_replaces_existing_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.snap");
    populated().save_snapshot(&path).unwrap();

    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("scratch").unwrap();
    db.insert("scratch", Document::new()).unwrap();
    db.load_snapshot(&path).unwrap();

    assert!(db.collection("scratch").is_err());
    assert_eq!(db.metrics().snapshot().documents, 5);
}

#[test]
fn test_inspect_summarizes_without_loading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.snap");
    populated().save_snapshot(&path).unwrap();

    let summary = snapshot::inspect(&path).unwrap();
    assert_eq!(summary.collections, 2);
    assert_eq!(summary.indexes, 2);
    assert_eq!(summary.documents, 5);
}

#[test]
fn test_empty_database_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.snap");
    Database::new(DatabaseConfig::default())
        .unwrap()
        .save_snapshot(&path)
        .unwrap();

    let db = populated();
    db.load_snapshot(&path).unwrap();
    assert!(db.list_collections().is_empty());
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_damaged_file_rejected_and_database_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.snap");
    populated().save_snapshot(&path).unwrap();
    let bytes = fs::read(&path).unwrap();

    let db = Database::new(DatabaseConfig::default()).unwrap();
    db.create_collection("keep").unwrap();
    db.insert("keep", Document::new().with("_id", 1)).unwrap();

    for position in [10, bytes.len() / 2, bytes.len() - 1] {
        let mut damaged = bytes.clone();
        damaged[position] ^= 0xFF;
        fs::write(&path, &damaged).unwrap();

        let err = db.load_snapshot(&path).unwrap_err();
        assert!(err.is_corruption(), "byte {}: {}", position, err);
        assert_eq!(err.code(), "AERO_SNAPSHOT_CORRUPTION");
        assert_eq!(db.list_collections(), vec!["keep".to_string()]);
        assert_eq!(db.count("keep", &Filter::All).unwrap(), 1);
    }

    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
    assert!(db.load_snapshot(&path).unwrap_err().is_corruption());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(DatabaseConfig::default()).unwrap();
    let err = db.load_snapshot(&dir.path().join("absent.snap")).unwrap_err();
    assert_eq!(err.code(), "AERO_SNAPSHOT_IO");
}
