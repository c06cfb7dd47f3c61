//! Inverted text index
//!
//! Strings are lowercased and split on any non-alphanumeric character. Each
//! posting records the weighted term frequency of a token in one document:
//! occurrences in a field count `weight` times.

use std::collections::{BTreeMap, HashMap};

use super::tree::RecordId;
use crate::value::{resolve_all, Document, Value};

/// Splits text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[derive(Debug, Default)]
pub struct TextIndex {
    /// (field path, weight) in declaration order
    fields: Vec<(String, u32)>,
    /// token -> record -> weighted term frequency
    postings: HashMap<String, BTreeMap<RecordId, u64>>,
}

impl TextIndex {
    pub fn new(fields: Vec<(String, u32)>) -> Self {
        Self {
            fields,
            postings: HashMap::new(),
        }
    }

    /// Weighted token counts a document contributes
    fn weighted_terms(&self, doc: &Document) -> HashMap<String, u64> {
        let mut terms: HashMap<String, u64> = HashMap::new();
        for (field, weight) in &self.fields {
            for value in resolve_all(doc, field) {
                let strings: Vec<&str> = match value {
                    Value::String(s) => vec![s.as_str()],
                    Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                    _ => continue,
                };
                for s in strings {
                    for token in tokenize(s) {
                        *terms.entry(token).or_insert(0) += u64::from(*weight);
                    }
                }
            }
        }
        terms
    }

    pub fn insert(&mut self, record: RecordId, doc: &Document) {
        for (token, score) in self.weighted_terms(doc) {
            self.postings.entry(token).or_default().insert(record, score);
        }
    }

    pub fn remove(&mut self, record: RecordId, doc: &Document) {
        for token in self.weighted_terms(doc).into_keys() {
            if let Some(posting) = self.postings.get_mut(&token) {
                posting.remove(&record);
                if posting.is_empty() {
                    self.postings.remove(&token);
                }
            }
        }
    }

    /// Documents matching any query token, best first.
    ///
    /// Repeated query tokens count once. Equal scores keep insertion order.
    pub fn search(&self, query: &str) -> Vec<(RecordId, f64)> {
        let mut tokens = tokenize(query);
        tokens.sort();
        tokens.dedup();

        let mut scores: BTreeMap<RecordId, u64> = BTreeMap::new();
        for token in &tokens {
            if let Some(posting) = self.postings.get(token) {
                for (record, score) in posting {
                    *scores.entry(*record).or_insert(0) += score;
                }
            }
        }

        let mut results: Vec<(RecordId, f64)> = scores
            .into_iter()
            .map(|(record, score)| (record, score as f64))
            .collect();
        results.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        results
    }

    pub fn clear(&mut self) {
        self.postings.clear();
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_json(value).unwrap()
    }

    fn product_index() -> TextIndex {
        TextIndex::new(vec![("name".into(), 2), ("description".into(), 1)])
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Galaxy S24, 5G-ready!"),
            vec!["galaxy", "s24", "5g", "ready"]
        );
        assert!(tokenize("  ,,  ").is_empty());
    }

    #[test]
    fn test_name_outranks_description() {
        let mut index = product_index();
        index.insert(1, &doc(json!({"name": "Case", "description": "fits any smartphone"})));
        index.insert(2, &doc(json!({"name": "Smartphone X", "description": "flagship"})));

        let results = index.search("smartphone");
        assert_eq!(results, vec![(2, 2.0), (1, 1.0)]);
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut index = product_index();
        index.insert(5, &doc(json!({"name": "phone"})));
        index.insert(3, &doc(json!({"name": "phone"})));
        let ids: Vec<_> = index.search("PHONE").into_iter().map(|(r, _)| r).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn test_term_frequency_and_multiple_tokens() {
        let mut index = product_index();
        index.insert(1, &doc(json!({"description": "camera camera camera"})));
        index.insert(2, &doc(json!({"name": "camera", "description": "battery"})));

        let results = index.search("camera battery camera");
        assert_eq!(results, vec![(1, 3.0), (2, 3.0)]);
    }

    #[test]
    fn test_remove_clears_postings() {
        let mut index = product_index();
        let d = doc(json!({"name": "laptop", "description": "thin laptop"}));
        index.insert(1, &d);
        index.remove(1, &d);
        assert!(index.search("laptop").is_empty());
        assert_eq!(index.token_count(), 0);
    }

    #[test]
    fn test_non_string_fields_ignored() {
        let mut index = product_index();
        index.insert(1, &doc(json!({"name": 42, "description": ["red", 7, "blue"]})));
        assert_eq!(index.search("red blue").len(), 1);
        assert!(index.search("42").is_empty());
    }
}
