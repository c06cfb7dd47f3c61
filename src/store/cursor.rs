//! Find cursors
//!
//! A cursor holds a validated query, not results. Every call to
//! [`Cursor::iter`] plans the query again against the collection's current
//! state.
//!
//! Without a sort, candidates are streamed: each one is fetched and evaluated
//! under its own short read lock, so documents written during iteration may
//! or may not be seen. With a sort, the matching documents are collected
//! under one read lock, then sorted.

use std::sync::Arc;

use super::collection::{visible, Collection};
use super::errors::StoreResult;
use crate::index::RecordId;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::query::{sort_documents, Filter, FindOptions};
use crate::value::{Document, Value};

/// Lazy, restartable result of a find
#[derive(Debug, Clone)]
pub struct Cursor {
    collection: Arc<Collection>,
    filter: Filter,
    options: FindOptions,
    include_deleted: bool,
}

impl Cursor {
    pub(crate) fn new(
        collection: Arc<Collection>,
        filter: Filter,
        options: FindOptions,
        include_deleted: bool,
    ) -> Self {
        Self {
            collection,
            filter,
            options,
            include_deleted,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Starts a new pass over the collection
    pub fn iter(&self) -> StoreResult<CursorIter<'_>> {
        let state = self.collection.read();
        let candidates = state.candidates(self.collection.name(), &self.filter)?;

        let source = if self.options.sort.is_empty() {
            Source::Streaming(candidates.into_iter())
        } else {
            let mut hits: Vec<(RecordId, Option<f64>, Arc<Document>)> = candidates
                .into_iter()
                .filter_map(|(record, score)| {
                    let doc = state.document(record)?;
                    visible(doc, &self.filter, self.include_deleted)
                        .then(|| (record, score, Arc::clone(doc)))
                })
                .collect();
            // ties keep insertion order, not score order
            hits.sort_by_key(|(record, _, _)| *record);
            sort_documents(&mut hits, &self.options.sort, |(_, _, doc)| doc.as_ref());
            let ordered: Vec<_> = hits.into_iter().map(|(_, s, d)| (s, d)).collect();
            Source::Sorted(ordered.into_iter())
        };
        drop(state);

        Ok(CursorIter {
            cursor: self,
            source,
            skipped: 0,
            emitted: 0,
            finished: false,
        })
    }

    /// Collects one full pass
    pub fn to_vec(&self) -> StoreResult<Vec<Document>> {
        Ok(self.iter()?.collect())
    }
}

enum Source {
    Streaming(std::vec::IntoIter<(RecordId, Option<f64>)>),
    Sorted(std::vec::IntoIter<(Option<f64>, Arc<Document>)>),
}

/// One pass of a [`Cursor`]
pub struct CursorIter<'a> {
    cursor: &'a Cursor,
    source: Source,
    skipped: usize,
    emitted: usize,
    finished: bool,
}

impl CursorIter<'_> {
    fn next_visible(&mut self) -> Option<(Option<f64>, Arc<Document>)> {
        let cursor = self.cursor;
        match &mut self.source {
            Source::Sorted(items) => items.next(),
            Source::Streaming(records) => {
                for (record, score) in records.by_ref() {
                    let doc = cursor.collection.read().document(record).cloned();
                    if let Some(doc) = doc {
                        if visible(&doc, &cursor.filter, cursor.include_deleted) {
                            return Some((score, doc));
                        }
                    }
                }
                None
            }
        }
    }

    fn finish(&mut self) -> Option<Document> {
        if !self.finished {
            self.finished = true;
            if Logger::enabled(Severity::Trace) {
                log_event_with_fields(
                    Event::QueryExecuted,
                    &[
                        ("collection", self.cursor.collection.name()),
                        ("returned", &self.emitted.to_string()),
                    ],
                );
            }
        }
        None
    }
}

impl Iterator for CursorIter<'_> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        let cursor = self.cursor;
        let options = &cursor.options;
        if self.finished || options.limit.is_some_and(|limit| self.emitted >= limit) {
            return self.finish();
        }
        loop {
            let Some((score, doc)) = self.next_visible() else {
                return self.finish();
            };
            if self.skipped < options.skip {
                self.skipped += 1;
                continue;
            }
            self.emitted += 1;

            let mut out = match &options.projection {
                Some(projection) => projection.apply(&doc),
                None => doc.as_ref().clone(),
            };
            if let (Some(field), Some(score)) = (&options.text_score_field, score) {
                out.insert(field.clone(), Value::Float(score));
            }
            return Some(out);
        }
    }
}
