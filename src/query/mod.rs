//! Query engine for aerodoc
//!
//! Per Query Semantics:
//! - Filters are trees of leaf predicates on dotted paths
//! - Candidates come from the text index, from index lookups on indexable
//!   legs, or from a full scan; every candidate is evaluated against the
//!   complete filter
//! - Sorting is stable with nulls and missing values first
//! - Projection is an include-list; `_id` is always kept
//!
//! The cursor that drives a find lives with the collection it reads
//! (`store::Cursor`); this module holds the pure parts.

mod errors;
mod filter;
mod options;
mod planner;
mod projection;
mod sorter;

pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity};
pub use filter::Filter;
pub use options::FindOptions;
pub use planner::{select_candidates, Candidates};
pub use projection::Projection;
pub use sorter::{compare_documents, sort_documents, validate_sort, SortDirection, SortKey};
