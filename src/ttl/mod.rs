//! TTL reaper
//!
//! A background task that periodically hard-deletes documents whose TTL
//! anchor is older than `now - expire_after_seconds`. Deletes go through
//! each collection's normal write path, under its exclusive lock.
//!
//! A document that expires between two sweeps is removed by the next one,
//! so every expired document is gone after at most two sweeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::observability::{log_event_with_fields, Event};
use crate::store::Database;

/// Runs one sweep over every collection at `now`
pub fn sweep_once(db: &Database, now: DateTime<Utc>) -> usize {
    let reaped = db.sweep_expired(now);
    log_event_with_fields(
        Event::ReaperSweep,
        &[("reaped", &reaped.to_string()), ("at", &now.to_rfc3339())],
    );
    reaped
}

/// Handle to a running reaper task
pub struct Reaper {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl Reaper {
    /// Starts the reaper at the database's configured interval
    pub fn spawn(db: Arc<Database>) -> Self {
        let period = db.config().reaper_interval();
        Self::spawn_with_interval(db, period)
    }

    /// Starts the reaper with an explicit period; the first sweep runs
    /// immediately
    pub fn spawn_with_interval(db: Arc<Database>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(run(db, period, shutdown_rx));
        Self { shutdown_tx, task }
    }

    /// Signals shutdown and waits for the task to finish its current sweep
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            log_event_with_fields(Event::ReaperDeleteFailed, &[("reason", &e.to_string())]);
        }
    }
}

async fn run(db: Arc<Database>, period: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    log_event_with_fields(
        Event::ReaperStart,
        &[("interval_ms", &period.as_millis().to_string())],
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let db = Arc::clone(&db);
                // sweeps take blocking collection locks
                let sweep = tokio::task::spawn_blocking(move || sweep_once(&db, Utc::now()));
                if let Err(e) = sweep.await {
                    log_event_with_fields(Event::ReaperDeleteFailed, &[("reason", &e.to_string())]);
                }
            }

            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    log_event_with_fields(Event::ReaperStop, &[]);
}
