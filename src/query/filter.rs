//! Filter predicates
//!
//! A filter is a tree of leaf predicates on dotted paths composed with
//! `and`, `or` and `not`.
//!
//! Matching rules:
//! - a path that reaches an array matches if the whole array or any element
//!   satisfies the leaf
//! - `eq null` matches an explicit null or a missing path
//! - range leaves only match values in the bound's type bracket, with ints
//!   and floats sharing one bracket
//! - a `text` leaf is satisfied by candidate selection: the engine only
//!   evaluates documents returned by the text index

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use crate::value::{
    compare_values, resolve_all, split_path, type_rank, values_equal, Document, Value,
};

/// Predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches every document
    All,
    Eq { path: String, value: Value },
    Ne { path: String, value: Value },
    Gt { path: String, value: Value },
    Gte { path: String, value: Value },
    Lt { path: String, value: Value },
    Lte { path: String, value: Value },
    In { path: String, values: Vec<Value> },
    Nin { path: String, values: Vec<Value> },
    Exists { path: String, exists: bool },
    Text { query: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(path: impl Into<String>, values: Vec<V>) -> Self {
        Filter::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(path: impl Into<String>, values: Vec<V>) -> Self {
        Filter::Nin {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(path: impl Into<String>, exists: bool) -> Self {
        Filter::Exists {
            path: path.into(),
            exists,
        }
    }

    pub fn text(query: impl Into<String>) -> Self {
        Filter::Text {
            query: query.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Checks structure: non-empty paths and compositions, scalar range
    /// bounds, at most one text leaf and never beneath `or`/`not`.
    pub fn validate(&self) -> QueryResult<()> {
        let mut text_leaves = 0;
        self.validate_inner(false, &mut text_leaves)?;
        if text_leaves > 1 {
            return Err(QueryError::invalid_filter(
                "a filter may contain at most one text predicate",
            ));
        }
        Ok(())
    }

    fn validate_inner(&self, negated_or_alternative: bool, text_leaves: &mut usize) -> QueryResult<()> {
        match self {
            Filter::All => Ok(()),
            Filter::Eq { path, .. }
            | Filter::Ne { path, .. }
            | Filter::In { path, .. }
            | Filter::Nin { path, .. }
            | Filter::Exists { path, .. } => check_path(path),
            Filter::Gt { path, value }
            | Filter::Gte { path, value }
            | Filter::Lt { path, value }
            | Filter::Lte { path, value } => {
                check_path(path)?;
                match value {
                    Value::Null | Value::Array(_) | Value::Document(_) => {
                        Err(QueryError::invalid_filter(format!(
                            "range bound on '{}' must be a scalar, got {}",
                            path,
                            value.type_name()
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Filter::Text { query } => {
                if negated_or_alternative {
                    return Err(QueryError::invalid_filter(
                        "text predicate cannot appear under 'or' or 'not'",
                    ));
                }
                if query.trim().is_empty() {
                    return Err(QueryError::invalid_filter("text query is empty"));
                }
                *text_leaves += 1;
                Ok(())
            }
            Filter::And(children) => {
                if children.is_empty() {
                    return Err(QueryError::invalid_filter("'and' needs at least one clause"));
                }
                children
                    .iter()
                    .try_for_each(|c| c.validate_inner(negated_or_alternative, text_leaves))
            }
            Filter::Or(children) => {
                if children.is_empty() {
                    return Err(QueryError::invalid_filter("'or' needs at least one clause"));
                }
                children
                    .iter()
                    .try_for_each(|c| c.validate_inner(true, text_leaves))
            }
            Filter::Not(inner) => inner.validate_inner(true, text_leaves),
        }
    }

    /// The text query, if the filter has a text leaf
    pub fn text_query(&self) -> Option<&str> {
        match self {
            Filter::Text { query } => Some(query),
            Filter::And(children) => children.iter().find_map(Filter::text_query),
            _ => None,
        }
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All | Filter::Text { .. } => true,
            Filter::Eq { path, value } => eq_matches(doc, path, value),
            Filter::Ne { path, value } => !eq_matches(doc, path, value),
            Filter::Gt { path, value } => range_matches(doc, path, value, |o| o == Ordering::Greater),
            Filter::Gte { path, value } => range_matches(doc, path, value, |o| o != Ordering::Less),
            Filter::Lt { path, value } => range_matches(doc, path, value, |o| o == Ordering::Less),
            Filter::Lte { path, value } => range_matches(doc, path, value, |o| o != Ordering::Greater),
            Filter::In { path, values } => values.iter().any(|v| eq_matches(doc, path, v)),
            Filter::Nin { path, values } => !values.iter().any(|v| eq_matches(doc, path, v)),
            Filter::Exists { path, exists } => !resolve_all(doc, path).is_empty() == *exists,
            Filter::And(children) => children.iter().all(|c| c.matches(doc)),
            Filter::Or(children) => children.iter().any(|c| c.matches(doc)),
            Filter::Not(inner) => !inner.matches(doc),
        }
    }
}

fn check_path(path: &str) -> QueryResult<()> {
    split_path(path)
        .map(|_| ())
        .map_err(|e| QueryError::invalid_filter(e.to_string()))
}

fn eq_matches(doc: &Document, path: &str, expected: &Value) -> bool {
    let values = resolve_all(doc, path);
    if values.is_empty() {
        return expected.is_null();
    }
    values.into_iter().any(|v| {
        values_equal(v, expected)
            || matches!(v, Value::Array(items) if items.iter().any(|i| values_equal(i, expected)))
    })
}

fn range_matches(doc: &Document, path: &str, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let rank = type_rank(bound);
    let check = |v: &Value| type_rank(v) == rank && accept(compare_values(v, bound));
    resolve_all(doc, path).into_iter().any(|v| match v {
        Value::Array(items) => items.iter().any(&check),
        other => check(other),
    })
}
