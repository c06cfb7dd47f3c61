//! Index Manager subsystem for aerodoc
//!
//! Indexes are derived, in-memory state owned by a collection and updated
//! synchronously on every write.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the collection, never the source of truth
//! - Deterministic: BTreeMap iteration order, record ids in insertion order
//! - Check before mutate: uniqueness is verified before any index changes
//!
//! # Invariants
//!
//! - After every write, lookup(field, predicate) equals a full scan filtered
//!   by the same predicate
//! - A unique index never maps one key to two records
//! - A rejected write leaves every index unchanged
//!
//! # Index kinds
//!
//! - `standard` / `unique`: ordered keys, multikey over arrays
//! - `text`: inverted token index with per-field weights
//! - `ttl`: expiry order over a timestamp field, consumed by the reaper

mod definition;
mod errors;
mod key;
mod manager;
mod text;
mod tree;
mod ttl;

pub use definition::{IndexDefinition, IndexKind, IndexOptions};
pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use key::{extract_keys, IndexKey, KeyPart};
pub use manager::{IndexManager, IndexPredicate, RangeBound};
pub use text::tokenize;
pub use tree::RecordId;
