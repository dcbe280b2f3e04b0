//! State shared between the poller and the HTTP server.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tesla_common::current_timestamp_millis;

use crate::snapshot::SnapshotCache;

/// Liveness heartbeat: the wall-clock time of the latest poll loop iteration.
#[derive(Debug, Default)]
pub struct Heartbeat {
    /// Millis since epoch; 0 until the first beat.
    last_loop_ms: AtomicI64,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loop iteration at `timestamp_ms`.
    pub fn beat_at(&self, timestamp_ms: i64) {
        self.last_loop_ms.store(timestamp_ms, Ordering::Relaxed);
    }

    pub fn last_loop_ms(&self) -> i64 {
        self.last_loop_ms.load(Ordering::Relaxed)
    }

    /// Time since the last loop iteration as seen at `now_ms`.
    pub fn elapsed_at(&self, now_ms: i64) -> Duration {
        let elapsed = now_ms.saturating_sub(self.last_loop_ms()).max(0);
        Duration::from_millis(elapsed as u64)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(current_timestamp_millis())
    }
}

/// Everything the poller publishes and the server reads.
///
/// The poller is the only writer of both fields.
#[derive(Debug, Default)]
pub struct ExporterState {
    pub snapshots: SnapshotCache,
    pub heartbeat: Heartbeat,
}

impl ExporterState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shareable state handle.
pub type SharedState = Arc<ExporterState>;
