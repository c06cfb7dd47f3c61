//! Observable events for aerodoc
//!
//! Every log line the engine emits names one of these events.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    BootStart,
    BootComplete,
    ConfigLoaded,
    Serving,
    ShutdownStart,
    ShutdownComplete,

    // Administration
    CollectionCreated,
    CollectionDropped,
    IndexCreated,
    IndexDropped,
    IndexRejected,

    // Writes
    WriteCommit,
    WriteRejected,

    // Reads
    QueryPlanned,
    QueryExecuted,
    QueryRejected,
    AggregateExecuted,
    AggregateRejected,

    // TTL reaper
    ReaperStart,
    ReaperSweep,
    ReaperDeleteFailed,
    ReaperStop,

    // Snapshots
    SnapshotSaved,
    SnapshotLoaded,
    SnapshotCorruption,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "AERODOC_STARTUP_BEGIN",
            Event::BootComplete => "AERODOC_STARTUP_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "AERODOC_SERVING",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::CollectionCreated => "COLLECTION_CREATED",
            Event::CollectionDropped => "COLLECTION_DROPPED",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexDropped => "INDEX_DROPPED",
            Event::IndexRejected => "INDEX_REJECTED",

            Event::WriteCommit => "WRITE_COMMIT",
            Event::WriteRejected => "WRITE_REJECTED",

            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::AggregateExecuted => "AGGREGATE_COMPLETE",
            Event::AggregateRejected => "AGGREGATE_REJECTED",

            Event::ReaperStart => "TTL_REAPER_START",
            Event::ReaperSweep => "TTL_SWEEP_COMPLETE",
            Event::ReaperDeleteFailed => "TTL_DELETE_FAILED",
            Event::ReaperStop => "TTL_REAPER_STOP",

            Event::SnapshotSaved => "SNAPSHOT_SAVED",
            Event::SnapshotLoaded => "SNAPSHOT_LOADED",
            Event::SnapshotCorruption => "SNAPSHOT_CORRUPTION",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SnapshotCorruption => Severity::Fatal,
            Event::ReaperDeleteFailed => Severity::Error,
            Event::IndexRejected
            | Event::WriteRejected
            | Event::QueryRejected
            | Event::AggregateRejected => Severity::Warn,
            Event::WriteCommit
            | Event::QueryPlanned
            | Event::QueryExecuted
            | Event::AggregateExecuted => Severity::Trace,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake_case() {
        let events = [
            Event::BootStart,
            Event::Serving,
            Event::CollectionCreated,
            Event::IndexRejected,
            Event::WriteCommit,
            Event::QueryPlanned,
            Event::AggregateExecuted,
            Event::ReaperSweep,
            Event::ReaperDeleteFailed,
            Event::SnapshotCorruption,
        ];
        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_severities() {
        assert!(Event::SnapshotCorruption.is_fatal());
        assert!(!Event::WriteRejected.is_fatal());
        assert_eq!(Event::WriteCommit.severity(), Severity::Trace);
        assert_eq!(Event::ReaperDeleteFailed.severity(), Severity::Error);
        assert_eq!(Event::IndexCreated.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(Event::ReaperSweep.to_string(), "TTL_SWEEP_COMPLETE");
    }
}
