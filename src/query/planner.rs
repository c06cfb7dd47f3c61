//! Candidate selection
//!
//! Decides which records a query must evaluate:
//!
//! 1. A text leaf drives candidates from the text index, in score order
//! 2. Otherwise each indexable leg (the filter itself, or a direct child of
//!    a top-level `and`) is looked up; the answered sets are intersected
//! 3. With no answerable leg, every record is scanned
//!
//! Candidates are always a superset of the matches. The engine evaluates the
//! full filter against each one.

use std::collections::BTreeSet;
use std::fmt;

use super::errors::QueryResult;
use super::filter::Filter;
use crate::index::{IndexManager, IndexPredicate, RangeBound, RecordId};
use crate::value::Value;

/// Records a query has to look at
#[derive(Debug, Clone, PartialEq)]
pub enum Candidates {
    /// Text index hits, best score first
    Text(Vec<(RecordId, f64)>),
    /// Intersection of index lookups on the listed fields
    Indexed {
        fields: Vec<String>,
        records: BTreeSet<RecordId>,
    },
    /// Every record, in insertion order
    Scan,
}

impl Candidates {
    /// Short plan description for logs
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Candidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidates::Text(hits) => write!(f, "text({} hits)", hits.len()),
            Candidates::Indexed { fields, records } => {
                write!(f, "index({}; {} candidates)", fields.join(","), records.len())
            }
            Candidates::Scan => write!(f, "scan"),
        }
    }
}

/// Selects candidates for an already validated filter.
pub fn select_candidates(filter: &Filter, indexes: &IndexManager) -> QueryResult<Candidates> {
    if let Some(query) = filter.text_query() {
        return Ok(Candidates::Text(indexes.text_search(query)?));
    }

    let legs: &[Filter] = match filter {
        Filter::And(children) => children,
        other => std::slice::from_ref(other),
    };

    let mut fields = Vec::new();
    let mut records: Option<BTreeSet<RecordId>> = None;
    for leg in legs {
        let Some((path, predicate)) = index_predicate(leg) else {
            continue;
        };
        let Some(found) = indexes.lookup(path, &predicate) else {
            continue;
        };
        fields.push(path.to_string());
        records = Some(match records {
            None => found,
            Some(acc) => acc.intersection(&found).copied().collect(),
        });
    }

    Ok(match records {
        Some(records) => Candidates::Indexed { fields, records },
        None => Candidates::Scan,
    })
}

/// The index predicate equivalent to a leaf, if the leaf has one
fn index_predicate(leaf: &Filter) -> Option<(&str, IndexPredicate)> {
    let bound = |value: &Value, inclusive: bool| RangeBound {
        value: value.clone(),
        inclusive,
    };
    match leaf {
        Filter::Eq { path, value } => Some((path.as_str(), IndexPredicate::Eq(value.clone()))),
        Filter::In { path, values } => Some((path.as_str(), IndexPredicate::In(values.clone()))),
        Filter::Gt { path, value } => Some((
            path.as_str(),
            IndexPredicate::Range {
                lower: Some(bound(value, false)),
                upper: None,
            },
        )),
        Filter::Gte { path, value } => Some((
            path.as_str(),
            IndexPredicate::Range {
                lower: Some(bound(value, true)),
                upper: None,
            },
        )),
        Filter::Lt { path, value } => Some((
            path.as_str(),
            IndexPredicate::Range {
                lower: None,
                upper: Some(bound(value, false)),
            },
        )),
        Filter::Lte { path, value } => Some((
            path.as_str(),
            IndexPredicate::Range {
                lower: None,
                upper: Some(bound(value, true)),
            },
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexDefinition, IndexKind, IndexOptions};
    use crate::value::Document;
    use serde_json::json;

    fn manager() -> IndexManager {
        let docs: Vec<(RecordId, Document)> = vec![
            json!({"sku": "A", "price": 100, "category": "Electronics", "name": "Phone"}),
            json!({"sku": "B", "price": 700, "category": "Electronics", "name": "Laptop"}),
            json!({"sku": "C", "price": 900, "category": "Books", "name": "Phone book"}),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i as RecordId, Document::from_json(v).unwrap()))
        .collect();

        let mut manager = IndexManager::new();
        for (fields, kind) in [
            (vec!["price"], IndexKind::Standard),
            (vec!["category"], IndexKind::Standard),
            (vec!["name"], IndexKind::Text),
        ] {
            let def = IndexDefinition::new(
                fields.into_iter().map(String::from).collect(),
                kind,
                IndexOptions::default(),
            )
            .unwrap();
            manager.create(def, docs.iter().map(|(r, d)| (*r, d))).unwrap();
        }
        manager
    }

    #[test]
    fn test_intersects_indexed_legs() {
        let filter = Filter::and(vec![
            Filter::gte("price", 500),
            Filter::eq("category", "Electronics"),
            Filter::eq("unindexed", 1),
        ]);
        match select_candidates(&filter, &manager()).unwrap() {
            Candidates::Indexed { fields, records } => {
                assert_eq!(fields, vec!["price", "category"]);
                assert_eq!(records.into_iter().collect::<Vec<_>>(), vec![1]);
            }
            other => panic!("expected index plan, got {}", other),
        }
    }

    #[test]
    fn test_or_falls_back_to_scan() {
        let filter = Filter::or(vec![Filter::eq("price", 100), Filter::eq("category", "Books")]);
        assert_eq!(select_candidates(&filter, &manager()).unwrap(), Candidates::Scan);
    }

    #[test]
    fn test_text_drives_candidates() {
        let filter = Filter::and(vec![Filter::text("phone"), Filter::lt("price", 500)]);
        match select_candidates(&filter, &manager()).unwrap() {
            Candidates::Text(hits) => assert_eq!(hits.len(), 2),
            other => panic!("expected text plan, got {}", other),
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(Candidates::Scan.describe(), "scan");
    }
}
