//! aerodoc - an embeddable document store and query engine
//!
//! Schemaless JSON-like documents grouped in collections, secondary indexes
//! (single, compound, unique, sparse, text, TTL), a filter/sort/projection
//! query engine with restartable cursors, an aggregation pipeline, a
//! background TTL reaper and checksummed snapshots.

pub mod aggregation;
pub mod cli;
pub mod index;
pub mod observability;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod ttl;
pub mod value;
