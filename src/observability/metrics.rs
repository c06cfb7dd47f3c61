//! Metrics registry for aerodoc
//!
//! - Counters only, monotonic except the live document gauge
//! - Reset only on process start
//! - Thread-safe, Relaxed atomics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by every collection of a database
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    writes_rejected: AtomicU64,
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    aggregations: AtomicU64,
    documents_reaped: AtomicU64,
    reaper_sweeps: AtomicU64,
    snapshots_saved: AtomicU64,
    /// Live documents across all collections
    documents: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_inserts(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.documents.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        // saturating: a dropped collection may already have been subtracted
        let _ = self
            .documents
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn increment_writes_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_aggregations(&self) {
        self.aggregations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one completed reaper sweep and the documents it removed
    pub fn record_sweep(&self, reaped: u64) {
        self.reaper_sweeps.fetch_add(1, Ordering::Relaxed);
        self.documents_reaped.fetch_add(reaped, Ordering::Relaxed);
    }

    pub fn increment_snapshots(&self) {
        self.snapshots_saved.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes `count` live documents (collection dropped)
    pub fn forget_documents(&self, count: u64) {
        let _ = self
            .documents
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(count))
            });
    }

    /// Adds `count` live documents loaded from a snapshot
    pub fn restore_documents(&self, count: u64) {
        self.documents.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            aggregations: self.aggregations.load(Ordering::Relaxed),
            documents_reaped: self.documents_reaped.load(Ordering::Relaxed),
            reaper_sweeps: self.reaper_sweeps.load(Ordering::Relaxed),
            snapshots_saved: self.snapshots_saved.load(Ordering::Relaxed),
            documents: self.documents.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub writes_rejected: u64,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub aggregations: u64,
    pub documents_reaped: u64,
    pub reaper_sweeps: u64,
    pub snapshots_saved: u64,
    pub documents: u64,
}
