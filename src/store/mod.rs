//! Document store for aerodoc
//!
//! # Design Principles
//!
//! 1. One exclusive lock per collection for the whole check-then-commit of a
//!    write; index maintenance happens inside it
//! 2. A rejected write changes nothing: no document, no index entry
//! 3. Reads take the shared lock per document access, never across a cursor
//! 4. Soft-deleted documents (`deleted: true`) stay stored but are hidden
//!    from `find`, `count`, `aggregate` and the batch writes unless the
//!    caller opts in
//!
//! # Invariants
//!
//! - `_id` is a non-null scalar, unique within its collection, and the first
//!   field of every stored document
//! - For every index, a lookup returns a superset of what a scan would match
//! - Insertion order breaks every ordering tie

mod collection;
mod config;
mod cursor;
mod database;
mod errors;
mod update;

pub use collection::{is_soft_deleted, BatchFailure, BatchResult, Collection, SOFT_DELETE_FIELD};
pub use config::DatabaseConfig;
pub use cursor::{Cursor, CursorIter};
pub use database::Database;
pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use update::{apply_updates, validate_ops, UpdateOp, UpdateOutcome, UPDATED_AT_FIELD};
