//! Expiry index
//!
//! Orders documents by the earliest timestamp held in the indexed field.
//! Values that are not timestamps are not tracked and never expire.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::tree::RecordId;
use crate::value::{resolve_all, Document, Value};

#[derive(Debug)]
pub struct TtlIndex {
    field: String,
    expire_after_micros: i64,
    /// (expiry anchor in micros, record)
    entries: BTreeSet<(i64, RecordId)>,
}

impl TtlIndex {
    pub fn new(field: impl Into<String>, expire_after_seconds: u64) -> Self {
        let micros = i64::try_from(expire_after_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1_000_000);
        Self {
            field: field.into(),
            expire_after_micros: micros,
            entries: BTreeSet::new(),
        }
    }

    /// Earliest timestamp at the field, looking inside arrays
    fn anchor(&self, doc: &Document) -> Option<i64> {
        let mut earliest: Option<i64> = None;
        for value in resolve_all(doc, &self.field) {
            let candidates: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for ts in candidates.into_iter().filter_map(Value::as_timestamp) {
                let micros = ts.timestamp_micros();
                earliest = Some(earliest.map_or(micros, |e| e.min(micros)));
            }
        }
        earliest
    }

    pub fn insert(&mut self, record: RecordId, doc: &Document) {
        if let Some(anchor) = self.anchor(doc) {
            self.entries.insert((anchor, record));
        }
    }

    pub fn remove(&mut self, record: RecordId, doc: &Document) {
        if let Some(anchor) = self.anchor(doc) {
            self.entries.remove(&(anchor, record));
        }
    }

    /// Records whose anchor is strictly older than `now - expire_after`.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<RecordId> {
        let cutoff = now
            .timestamp_micros()
            .saturating_sub(self.expire_after_micros);
        self.entries
            .iter()
            .take_while(|(anchor, _)| *anchor < cutoff)
            .map(|(_, record)| *record)
            .collect()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(ts: DateTime<Utc>) -> Document {
        Document::new().with("created_at", ts)
    }

    #[test]
    fn test_expired_respects_cutoff() {
        let now = Utc::now();
        let mut index = TtlIndex::new("created_at", 3600);
        index.insert(1, &at(now - Duration::hours(2)));
        index.insert(2, &at(now - Duration::minutes(10)));
        index.insert(3, &Document::new().with("created_at", "yesterday"));

        assert_eq!(index.expired(now), vec![1]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_array_uses_earliest_timestamp() {
        let now = Utc::now();
        let mut index = TtlIndex::new("created_at", 60);
        let d = Document::new().with(
            "created_at",
            Value::Array(vec![
                Value::Timestamp(now),
                Value::Timestamp(now - Duration::hours(1)),
            ]),
        );
        index.insert(7, &d);
        assert_eq!(index.expired(now), vec![7]);

        index.remove(7, &d);
        assert!(index.is_empty());
    }

    #[test]
    fn test_missing_field_never_expires() {
        let mut index = TtlIndex::new("created_at", 0);
        index.insert(1, &Document::new().with("name", "x"));
        assert!(index.expired(Utc::now()).is_empty());
    }
}
