//! Observability subsystem for aerodoc
//!
//! - Structured JSON-line logging
//! - Typed lifecycle and operation events
//! - Atomic counters
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes an operation's outcome
//! 2. No background threads
//! 3. Deterministic output: fixed key order per line

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::BootStart);
        log_event_with_fields(Event::CollectionCreated, &[("collection", "products")]);
    }
}
