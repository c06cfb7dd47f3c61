//! Collections
//!
//! A collection owns its documents and its indexes behind one lock. Writes
//! hold the exclusive lock for the whole check-then-commit, so a rejected
//! write leaves both untouched. Reads take the shared lock per document
//! access; a cursor never holds it between items.
//!
//! Documents are keyed internally by a [`RecordId`] assigned in insertion
//! order. Scans walk records in that order, which makes every unsorted
//! result and every sort tie deterministic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cursor::Cursor;
use super::errors::{StoreError, StoreResult};
use super::update::{apply_updates, validate_ops, UpdateOp};
use crate::aggregation::{execute, Pipeline};
use crate::index::{IndexDefinition, IndexKind, IndexManager, IndexOptions, KeyPart, RecordId};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry, Severity};
use crate::query::{select_candidates, Candidates, Filter, FindOptions, QueryError, QueryResult};
use crate::value::{Document, Value, ID_FIELD};

/// A document with `deleted: true` is soft-deleted
pub const SOFT_DELETE_FIELD: &str = "deleted";

pub fn is_soft_deleted(doc: &Document) -> bool {
    matches!(doc.get(SOFT_DELETE_FIELD), Some(Value::Bool(true)))
}

/// One element of a batch that did not go through
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Position in the input (insert) or in the matched targets (update, delete)
    pub index: usize,
    pub id: Option<Value>,
    pub error: StoreError,
}

/// Outcome of a batch operation
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Identifiers of the documents the operation succeeded on, in order
    pub succeeded: Vec<Value>,
    pub failures: Vec<BatchFailure>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Documents, identifier map and indexes of one collection
#[derive(Debug, Default)]
pub(crate) struct CollectionState {
    documents: BTreeMap<RecordId, Arc<Document>>,
    ids: HashMap<KeyPart, RecordId>,
    indexes: IndexManager,
    next_record: RecordId,
}

fn id_key(id: &Value) -> StoreResult<KeyPart> {
    match KeyPart::from_value(id) {
        Some(KeyPart::Null) | None => Err(StoreError::invalid_document(format!(
            "_id must be a non-null scalar, got {}",
            id.type_name()
        ))),
        Some(key) => Ok(key),
    }
}

/// True if `doc` belongs in a result for `filter`
pub(crate) fn visible(doc: &Document, filter: &Filter, include_deleted: bool) -> bool {
    (include_deleted || !is_soft_deleted(doc)) && filter.matches(doc)
}

impl CollectionState {
    fn record_of(&self, id: &Value) -> Option<RecordId> {
        let key = KeyPart::from_value(id)?;
        self.ids.get(&key).copied()
    }

    pub(crate) fn document(&self, record: RecordId) -> Option<&Arc<Document>> {
        self.documents.get(&record)
    }

    fn insert(&mut self, collection: &str, mut document: Document) -> StoreResult<Value> {
        let id = match document.id() {
            Some(id) => id.clone(),
            None => {
                let id = Value::String(Uuid::new_v4().to_string());
                document.insert(ID_FIELD, id.clone());
                id
            }
        };
        document.promote_id();

        let key = id_key(&id)?;
        if self.ids.contains_key(&key) {
            return Err(StoreError::duplicate_id(collection, id.to_json()));
        }

        let record = self.next_record;
        self.indexes.on_write(record, None, Some(&document))?;
        self.next_record += 1;
        self.ids.insert(key, record);
        self.documents.insert(record, Arc::new(document));
        Ok(id)
    }

    fn update_record(
        &mut self,
        collection: &str,
        record: RecordId,
        ops: &[UpdateOp],
    ) -> StoreResult<bool> {
        let Some(current) = self.documents.get(&record).cloned() else {
            return Err(StoreError::not_found(collection, format!("#{}", record)));
        };
        let outcome = apply_updates(&current, ops, Value::now())?;
        self.indexes
            .on_write(record, Some(&current), Some(&outcome.document))?;
        self.documents.insert(record, Arc::new(outcome.document));
        Ok(outcome.applied)
    }

    fn remove_record(&mut self, record: RecordId) -> StoreResult<Option<Arc<Document>>> {
        let Some(doc) = self.documents.get(&record).cloned() else {
            return Ok(None);
        };
        self.indexes.on_write(record, Some(&doc), None)?;
        self.documents.remove(&record);
        if let Some(key) = doc.id().and_then(KeyPart::from_value) {
            self.ids.remove(&key);
        }
        Ok(Some(doc))
    }

    /// Records to evaluate for `filter`, with text scores when text-driven
    pub(crate) fn candidates(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> QueryResult<Vec<(RecordId, Option<f64>)>> {
        let plan = select_candidates(filter, &self.indexes)?;
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::QueryPlanned,
                &[("collection", collection), ("plan", &plan.describe())],
            );
        }
        Ok(match plan {
            Candidates::Text(hits) => {
                hits.into_iter().map(|(r, s)| (r, Some(s))).collect()
            }
            Candidates::Indexed { records, .. } => {
                records.into_iter().map(|r| (r, None)).collect()
            }
            Candidates::Scan => self.documents.keys().map(|r| (*r, None)).collect(),
        })
    }

    /// Candidates that satisfy the whole filter, in candidate order
    fn matching(
        &self,
        collection: &str,
        filter: &Filter,
        include_deleted: bool,
    ) -> QueryResult<Vec<RecordId>> {
        Ok(self
            .candidates(collection, filter)?
            .into_iter()
            .filter(|(r, _)| {
                self.documents
                    .get(r)
                    .is_some_and(|d| visible(d, filter, include_deleted))
            })
            .map(|(r, _)| r)
            .collect())
    }
}

/// A named set of documents with its own indexes
#[derive(Debug)]
pub struct Collection {
    name: String,
    state: RwLock<CollectionState>,
    metrics: Arc<MetricsRegistry>,
    /// Soft-delete visibility when a find or pipeline does not say
    include_deleted: bool,
}

impl Collection {
    pub fn new(name: impl Into<String>, metrics: Arc<MetricsRegistry>, include_deleted: bool) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CollectionState::default()),
            metrics,
            include_deleted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, CollectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CollectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored documents, soft-deleted ones included
    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn committed(&self, op: &str, id: &Value) {
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::WriteCommit,
                &[
                    ("collection", &self.name),
                    ("op", op),
                    ("id", &id.to_json().to_string()),
                ],
            );
        }
    }

    fn rejected<T>(&self, op: &str, err: StoreError) -> StoreResult<T> {
        self.metrics.increment_writes_rejected();
        log_event_with_fields(
            Event::WriteRejected,
            &[
                ("collection", &self.name),
                ("op", op),
                ("code", err.code().code()),
                ("reason", err.message()),
            ],
        );
        Err(err)
    }

    fn query_rejected<T>(&self, err: StoreError) -> StoreResult<T> {
        self.metrics.increment_queries_rejected();
        log_event_with_fields(
            Event::QueryRejected,
            &[
                ("collection", &self.name),
                ("code", err.code().code()),
                ("reason", err.message()),
            ],
        );
        Err(err)
    }

    /// Validates a filter and, for text filters, the presence of a text index
    fn check_filter(&self, filter: &Filter) -> QueryResult<()> {
        filter.validate()?;
        if filter.text_query().is_some() && !self.read().indexes.has_text_index() {
            return Err(QueryError::invalid_filter(format!(
                "text search on '{}' requires a text index",
                self.name
            )));
        }
        Ok(())
    }

    // ==================
    // Writes
    // ==================

    /// Stores `document`, generating a UUID `_id` if it has none.
    ///
    /// Fails with DuplicateKey if the `_id` or any unique index key is taken;
    /// nothing is stored or indexed in that case.
    pub fn insert(&self, document: Document) -> StoreResult<Value> {
        let result = self.write().insert(&self.name, document);
        match result {
            Ok(id) => {
                self.metrics.increment_inserts();
                self.committed("insert", &id);
                Ok(id)
            }
            Err(err) => self.rejected("insert", err),
        }
    }

    /// Inserts each document independently
    pub fn insert_many(&self, documents: Vec<Document>) -> BatchResult {
        let mut result = BatchResult::default();
        for (index, document) in documents.into_iter().enumerate() {
            let id = document.id().cloned();
            match self.insert(document) {
                Ok(id) => result.succeeded.push(id),
                Err(error) => result.failures.push(BatchFailure { index, id, error }),
            }
        }
        result
    }

    pub fn get(&self, id: &Value) -> Option<Document> {
        let state = self.read();
        let record = state.record_of(id)?;
        state.documents.get(&record).map(|d| d.as_ref().clone())
    }

    /// Applies `ops` atomically to one document.
    ///
    /// Returns whether anything besides the `updated_at` stamp changed.
    pub fn update(&self, id: &Value, ops: &[UpdateOp]) -> StoreResult<bool> {
        if let Err(err) = validate_ops(ops) {
            return self.rejected("update", err);
        }
        let result = {
            let mut state = self.write();
            match state.record_of(id) {
                Some(record) => state.update_record(&self.name, record, ops),
                None => Err(StoreError::not_found(&self.name, id.to_json())),
            }
        };
        match result {
            Ok(applied) => {
                self.metrics.increment_updates();
                self.committed("update", id);
                Ok(applied)
            }
            Err(err) => self.rejected("update", err),
        }
    }

    /// Hard delete; deleting a missing id returns false
    pub fn delete(&self, id: &Value) -> StoreResult<bool> {
        let result = {
            let mut state = self.write();
            match state.record_of(id) {
                Some(record) => state.remove_record(record),
                None => Ok(None),
            }
        };
        match result {
            Ok(Some(_)) => {
                self.metrics.increment_deletes();
                self.committed("delete", id);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => self.rejected("delete", err),
        }
    }

    /// Updates every visible document matching `filter`
    pub fn update_many(&self, filter: &Filter, ops: &[UpdateOp]) -> StoreResult<BatchResult> {
        if let Err(err) = self.check_filter(filter) {
            return self.rejected("update_many", err.into());
        }
        if let Err(err) = validate_ops(ops) {
            return self.rejected("update_many", err);
        }

        let mut result = BatchResult::default();
        {
            let mut state = self.write();
            let targets = match state.matching(&self.name, filter, self.include_deleted) {
                Ok(targets) => targets,
                Err(err) => return self.rejected("update_many", err.into()),
            };
            for (index, record) in targets.into_iter().enumerate() {
                let id = state.document(record).and_then(|d| d.id().cloned());
                match state.update_record(&self.name, record, ops) {
                    Ok(_) => {
                        self.metrics.increment_updates();
                        result.succeeded.extend(id);
                    }
                    Err(error) => result.failures.push(BatchFailure { index, id, error }),
                }
            }
        }
        self.log_batch("update_many", &result);
        Ok(result)
    }

    /// Hard-deletes every visible document matching `filter`
    pub fn delete_many(&self, filter: &Filter) -> StoreResult<BatchResult> {
        if let Err(err) = self.check_filter(filter) {
            return self.rejected("delete_many", err.into());
        }

        let mut result = BatchResult::default();
        {
            let mut state = self.write();
            let targets = match state.matching(&self.name, filter, self.include_deleted) {
                Ok(targets) => targets,
                Err(err) => return self.rejected("delete_many", err.into()),
            };
            for (index, record) in targets.into_iter().enumerate() {
                match state.remove_record(record) {
                    Ok(Some(doc)) => {
                        self.metrics.increment_deletes();
                        result.succeeded.extend(doc.id().cloned());
                    }
                    Ok(None) => {}
                    Err(error) => result.failures.push(BatchFailure {
                        index,
                        id: None,
                        error,
                    }),
                }
            }
        }
        self.log_batch("delete_many", &result);
        Ok(result)
    }

    fn log_batch(&self, op: &str, result: &BatchResult) {
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::WriteCommit,
                &[
                    ("collection", &self.name),
                    ("op", op),
                    ("succeeded", &result.succeeded.len().to_string()),
                    ("failed", &result.failures.len().to_string()),
                ],
            );
        }
    }

    // ==================
    // Reads
    // ==================

    /// Lazy, restartable query.
    ///
    /// Filter and options are validated here; documents are read only when
    /// the cursor is iterated.
    pub fn find(self: &Arc<Self>, filter: Filter, options: FindOptions) -> StoreResult<Cursor> {
        if let Err(err) = self.check_filter(&filter).and_then(|_| options.validate()) {
            return self.query_rejected(err.into());
        }
        self.metrics.increment_queries_executed();
        let include_deleted = options.include_deleted.unwrap_or(self.include_deleted);
        Ok(Cursor::new(Arc::clone(self), filter, options, include_deleted))
    }

    /// First document of `find`, or None
    pub fn find_one(self: &Arc<Self>, filter: Filter, options: FindOptions) -> StoreResult<Option<Document>> {
        let cursor = self.find(filter, options.limit(1))?;
        let first = cursor.iter()?.next();
        Ok(first)
    }

    /// Visible documents matching `filter`
    pub fn count(&self, filter: &Filter) -> StoreResult<usize> {
        if let Err(err) = self.check_filter(filter) {
            return self.query_rejected(err.into());
        }
        self.metrics.increment_queries_executed();
        let state = self.read();
        Ok(state.matching(&self.name, filter, self.include_deleted)?.len())
    }

    /// Runs `pipeline` over this collection's documents.
    ///
    /// A leading `match` selects the input through the indexes. Soft-deleted
    /// documents are left out of the input unless the pipeline opts in.
    pub fn aggregate(&self, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        if let Err(err) = pipeline.validate() {
            self.metrics.increment_queries_rejected();
            log_event_with_fields(
                Event::AggregateRejected,
                &[
                    ("collection", &self.name),
                    ("code", err.code().code()),
                    ("reason", err.message()),
                ],
            );
            return Err(err.into());
        }
        if let Some(filter) = pipeline.leading_match() {
            if let Err(err) = self.check_filter(filter) {
                return self.query_rejected(err.into());
            }
        }

        let include_deleted = pipeline.include_deleted.unwrap_or(self.include_deleted);
        let input: Vec<Document> = {
            let state = self.read();
            let records: Vec<RecordId> = match pipeline.leading_match() {
                Some(filter) => state
                    .candidates(&self.name, filter)?
                    .into_iter()
                    .map(|(r, _)| r)
                    .collect(),
                None => state.documents.keys().copied().collect(),
            };
            records
                .into_iter()
                .filter_map(|r| state.documents.get(&r))
                .filter(|d| include_deleted || !is_soft_deleted(d))
                .map(|d| d.as_ref().clone())
                .collect()
        };

        let input_len = input.len();
        let output = execute(&pipeline.stages, input);
        self.metrics.increment_aggregations();
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::AggregateExecuted,
                &[
                    ("collection", &self.name),
                    ("stages", &pipeline.stages.len().to_string()),
                    ("input", &input_len.to_string()),
                    ("output", &output.len().to_string()),
                ],
            );
        }
        Ok(output)
    }

    // ==================
    // Indexes
    // ==================

    /// Creates and back-fills an index
    pub fn create_index(
        &self,
        fields: Vec<String>,
        kind: IndexKind,
        options: IndexOptions,
    ) -> StoreResult<IndexDefinition> {
        let result = IndexDefinition::new(fields, kind, options)
            .map_err(StoreError::from)
            .and_then(|definition| self.add_index(definition.clone()).map(|_| definition));
        match &result {
            Ok(definition) => log_event_with_fields(
                Event::IndexCreated,
                &[("collection", &self.name), ("index", &definition.name)],
            ),
            Err(err) => log_event_with_fields(
                Event::IndexRejected,
                &[
                    ("collection", &self.name),
                    ("code", err.code().code()),
                    ("reason", err.message()),
                ],
            ),
        }
        result
    }

    /// Registers an already validated definition
    pub(crate) fn add_index(&self, definition: IndexDefinition) -> StoreResult<()> {
        let mut state = self.write();
        let CollectionState {
            documents, indexes, ..
        } = &mut *state;
        indexes.create(definition, documents.iter().map(|(r, d)| (*r, d.as_ref())))?;
        Ok(())
    }

    pub fn drop_index(&self, name: &str) -> StoreResult<IndexDefinition> {
        let definition = self.write().indexes.drop(name)?;
        log_event_with_fields(
            Event::IndexDropped,
            &[("collection", &self.name), ("index", name)],
        );
        Ok(definition)
    }

    /// Definitions in creation order
    pub fn list_indexes(&self) -> Vec<IndexDefinition> {
        self.read().indexes.definitions()
    }

    // ==================
    // TTL and snapshots
    // ==================

    /// Hard-deletes every document a TTL index reports expired at `now`.
    ///
    /// Failures are logged and skipped. Returns the number removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.write();
        if !state.indexes.has_ttl_index() {
            return 0;
        }
        let mut reaped = 0;
        for record in state.indexes.expired(now) {
            match state.remove_record(record) {
                Ok(Some(_)) => {
                    reaped += 1;
                    self.metrics.increment_deletes();
                }
                Ok(None) => {}
                Err(err) => log_event_with_fields(
                    Event::ReaperDeleteFailed,
                    &[
                        ("collection", &self.name),
                        ("record", &record.to_string()),
                        ("code", err.code().code()),
                        ("reason", err.message()),
                    ],
                ),
            }
        }
        reaped
    }

    pub fn has_ttl_index(&self) -> bool {
        self.read().indexes.has_ttl_index()
    }

    /// Index definitions and documents in insertion order
    pub(crate) fn export(&self) -> (Vec<IndexDefinition>, Vec<Document>) {
        let state = self.read();
        let documents = state.documents.values().map(|d| d.as_ref().clone()).collect();
        (state.indexes.definitions(), documents)
    }

    /// Fills an empty collection from exported parts, without write logging
    pub(crate) fn restore(
        &self,
        indexes: Vec<IndexDefinition>,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        {
            let mut state = self.write();
            for document in documents {
                state.insert(&self.name, document)?;
            }
        }
        for definition in indexes {
            self.add_index(definition)?;
        }
        Ok(())
    }
}
