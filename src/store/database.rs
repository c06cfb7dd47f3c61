//! Database: the set of named collections
//!
//! Collections are independent; each has its own lock and indexes. The
//! database-level lock only guards the name map and is never held while a
//! collection operation runs.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::collection::{BatchResult, Collection};
use super::config::DatabaseConfig;
use super::cursor::Cursor;
use super::errors::{StoreError, StoreResult};
use super::update::UpdateOp;
use crate::aggregation::Pipeline;
use crate::index::{IndexDefinition, IndexKind, IndexOptions};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::query::{Filter, FindOptions};
use crate::snapshot::{self, SnapshotResult};
use crate::value::{Document, Value};

const MAX_NAME_LEN: usize = 120;

fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_name(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::invalid_name(name, "name is too long"));
    }
    if name.contains(&['$', '\0'][..]) {
        return Err(StoreError::invalid_name(name, "name contains '$' or NUL"));
    }
    Ok(())
}

#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    collections: RwLock<BTreeMap<String, Arc<Collection>>>,
    metrics: Arc<MetricsRegistry>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            collections: RwLock::new(BTreeMap::new()),
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    // ==================
    // Collections
    // ==================

    pub fn create_collection(&self, name: &str) -> StoreResult<Arc<Collection>> {
        validate_name(name)?;
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        if collections.contains_key(name) {
            return Err(StoreError::collection_exists(name));
        }
        let collection = Arc::new(self.empty_collection(name));
        collections.insert(name.to_string(), Arc::clone(&collection));
        log_event_with_fields(Event::CollectionCreated, &[("collection", name)]);
        Ok(collection)
    }

    pub(crate) fn empty_collection(&self, name: &str) -> Collection {
        Collection::new(name, Arc::clone(&self.metrics), self.config.include_deleted)
    }

    pub fn collection(&self, name: &str) -> StoreResult<Arc<Collection>> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::unknown_collection(name))
    }

    /// Removes a collection with its documents and indexes.
    ///
    /// Cursors already open on it keep reading the detached collection.
    pub fn drop_collection(&self, name: &str) -> StoreResult<()> {
        let removed = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .ok_or_else(|| StoreError::unknown_collection(name))?;
        self.metrics.forget_documents(removed.len() as u64);
        log_event_with_fields(Event::CollectionDropped, &[("collection", name)]);
        Ok(())
    }

    /// Collection names in sorted order
    pub fn list_collections(&self) -> Vec<String> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub(crate) fn all_collections(&self) -> Vec<Arc<Collection>> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Swaps in a complete set of collections
    pub(crate) fn replace_collections(&self, replacement: Vec<Arc<Collection>>) {
        let restored: usize = replacement.iter().map(|c| c.len()).sum();
        let replacement: BTreeMap<String, Arc<Collection>> = replacement
            .into_iter()
            .map(|c| (c.name().to_string(), c))
            .collect();
        let previous = std::mem::replace(
            &mut *self.collections.write().unwrap_or_else(PoisonError::into_inner),
            replacement,
        );
        let forgotten: usize = previous.values().map(|c| c.len()).sum();
        self.metrics.forget_documents(forgotten as u64);
        self.metrics.restore_documents(restored as u64);
    }

    // ==================
    // Indexes
    // ==================

    pub fn create_index(
        &self,
        collection: &str,
        fields: Vec<String>,
        kind: IndexKind,
        options: IndexOptions,
    ) -> StoreResult<IndexDefinition> {
        self.collection(collection)?.create_index(fields, kind, options)
    }

    pub fn drop_index(&self, collection: &str, name: &str) -> StoreResult<IndexDefinition> {
        self.collection(collection)?.drop_index(name)
    }

    pub fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexDefinition>> {
        Ok(self.collection(collection)?.list_indexes())
    }

    // ==================
    // Documents
    // ==================

    pub fn insert(&self, collection: &str, document: Document) -> StoreResult<Value> {
        self.collection(collection)?.insert(document)
    }

    pub fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<BatchResult> {
        Ok(self.collection(collection)?.insert_many(documents))
    }

    pub fn get(&self, collection: &str, id: &Value) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection)?.get(id))
    }

    pub fn update(&self, collection: &str, id: &Value, ops: &[UpdateOp]) -> StoreResult<bool> {
        self.collection(collection)?.update(id, ops)
    }

    pub fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        ops: &[UpdateOp],
    ) -> StoreResult<BatchResult> {
        self.collection(collection)?.update_many(filter, ops)
    }

    pub fn delete(&self, collection: &str, id: &Value) -> StoreResult<bool> {
        self.collection(collection)?.delete(id)
    }

    pub fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<BatchResult> {
        self.collection(collection)?.delete_many(filter)
    }

    // ==================
    // Queries
    // ==================

    pub fn find(&self, collection: &str, filter: Filter, options: FindOptions) -> StoreResult<Cursor> {
        self.collection(collection)?.find(filter, options)
    }

    pub fn find_one(
        &self,
        collection: &str,
        filter: Filter,
        options: FindOptions,
    ) -> StoreResult<Option<Document>> {
        self.collection(collection)?.find_one(filter, options)
    }

    pub fn count(&self, collection: &str, filter: &Filter) -> StoreResult<usize> {
        self.collection(collection)?.count(filter)
    }

    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        self.collection(collection)?.aggregate(pipeline)
    }

    // ==================
    // TTL and persistence
    // ==================

    /// One reaper pass over every collection with a TTL index
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let reaped: usize = self
            .all_collections()
            .iter()
            .filter(|c| c.has_ttl_index())
            .map(|c| c.sweep_expired(now))
            .sum();
        self.metrics.record_sweep(reaped as u64);
        reaped
    }

    pub fn save_snapshot(&self, path: &Path) -> SnapshotResult<()> {
        snapshot::save(self, path)
    }

    /// Replaces every collection with the contents of a snapshot.
    ///
    /// The file is fully read and verified first; on any error the database
    /// is left as it was.
    pub fn load_snapshot(&self, path: &Path) -> SnapshotResult<()> {
        snapshot::load(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreErrorCode;
    use serde_json::json;

    fn db() -> Database {
        Database::new(DatabaseConfig::default()).unwrap()
    }

    #[test]
    fn test_collection_lifecycle() {
        let db = db();
        db.create_collection("products").unwrap();
        db.create_collection("orders").unwrap();
        assert_eq!(db.list_collections(), vec!["orders", "products"]);

        let err = db.create_collection("products").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::AeroCollectionExists);

        db.drop_collection("orders").unwrap();
        let err = db.collection("orders").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::AeroUnknownCollection);
        let err = db.drop_collection("orders").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::AeroUnknownCollection);
    }

    #[test]
    fn test_invalid_names() {
        let db = db();
        let long = "x".repeat(MAX_NAME_LEN + 1);
        for name in ["", "a$b", long.as_str()] {
            let err = db.create_collection(name).unwrap_err();
            assert_eq!(err.code(), StoreErrorCode::AeroInvalidName);
        }
    }

    #[test]
    fn test_operations_on_unknown_collection() {
        let db = db();
        let err = db.insert("nope", Document::new()).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::AeroUnknownCollection);
        let err = db.count("nope", &Filter::All).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::AeroUnknownCollection);
    }

    #[test]
    fn test_delegation_and_metrics() {
        let db = db();
        db.create_collection("users").unwrap();
        let id = db
            .insert("users", Document::from_json(json!({"email": "a@x.io"})).unwrap())
            .unwrap();
        db.update("users", &id, &[UpdateOp::set("name", "Ann")]).unwrap();
        assert_eq!(db.count("users", &Filter::eq("name", "Ann")).unwrap(), 1);
        assert!(db.delete("users", &id).unwrap());

        let m = db.metrics().snapshot();
        assert_eq!((m.inserts, m.updates, m.deletes, m.documents), (1, 1, 1, 0));
    }

    #[test]
    fn test_drop_collection_forgets_documents() {
        let db = db();
        db.create_collection("tmp").unwrap();
        db.insert("tmp", Document::new()).unwrap();
        db.insert("tmp", Document::new()).unwrap();
        db.drop_collection("tmp").unwrap();
        assert_eq!(db.metrics().snapshot().documents, 0);
    }

    #[test]
    fn test_zero_reaper_interval_rejected() {
        let config = DatabaseConfig {
            reaper_interval_secs: 0,
            ..DatabaseConfig::default()
        };
        assert!(Database::new(config).is_err());
    }
}
