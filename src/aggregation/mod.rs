//! Aggregation engine for aerodoc
//!
//! A pipeline is an ordered list of stages (`match`, `group`, `project`,
//! `sort`, `skip`, `limit`). Each stage is fully materialized before the next
//! one runs.
//!
//! # Invariants
//!
//! - Validation happens before any document is read
//! - Output is a function of the input order alone
//! - Non-numeric operands never fail a pipeline: `sum` and `avg` skip them
//!
//! When the first stage is a `match`, the owning collection uses it to select
//! input candidates through its indexes, so a text filter is only allowed
//! there.

mod errors;
mod executor;
mod expr;
mod pipeline;

pub use errors::{PipelineError, PipelineErrorCode, PipelineResult, Severity};
pub use executor::execute;
pub use expr::Expr;
pub use pipeline::{Accumulator, AccumulatorOp, Pipeline, ProjectField, Stage};
