//! Find options

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};
use super::projection::Projection;
use super::sorter::{validate_sort, SortKey};
use crate::value::{paths_overlap, ID_FIELD};

/// Shape, order and window of a `find`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    /// Include-list; None returns whole documents
    pub projection: Option<Projection>,
    /// Empty keeps candidate order (insertion order, or score order for text)
    pub sort: Vec<SortKey>,
    pub skip: usize,
    pub limit: Option<usize>,
    /// Overrides the database default for soft-deleted documents
    pub include_deleted: Option<bool>,
    /// Top-level field to receive the text relevance score. It replaces a
    /// stored field of the same name and may not overlap the projection.
    pub text_score_field: Option<String>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project<S: Into<String>>(mut self, fields: Vec<S>) -> Self {
        self.projection = Some(Projection::include(fields));
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = Some(include);
        self
    }

    pub fn text_score(mut self, field: impl Into<String>) -> Self {
        self.text_score_field = Some(field.into());
        self
    }

    pub fn validate(&self) -> QueryResult<()> {
        if let Some(projection) = &self.projection {
            projection.validate()?;
        }
        validate_sort(&self.sort)?;
        if self.limit == Some(0) {
            return Err(QueryError::invalid_filter("limit must be > 0"));
        }
        if let Some(field) = &self.text_score_field {
            if field.is_empty() || field.contains('.') || field == ID_FIELD {
                return Err(QueryError::invalid_filter(format!(
                    "text score field '{}' must be a top-level name other than _id",
                    field
                )));
            }
            let projected = self.projection.as_ref().map_or(&[][..], |p| p.fields());
            if let Some(path) = projected.iter().find(|p| paths_overlap(p, field)) {
                return Err(QueryError::invalid_filter(format!(
                    "text score field '{}' overlaps projected '{}'",
                    field, path
                )));
            }
        }
        Ok(())
    }
}
