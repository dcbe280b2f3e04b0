//! Published metric snapshots.

use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::mapping::MetricEntries;

/// Snapshots with fewer entries than this are never published.
pub const MIN_PUBLISHED_ENTRIES: usize = 2;

/// One complete, immutable set of metric entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    entries: MetricEntries,
    acquired_at: SystemTime,
}

impl MetricsSnapshot {
    pub fn new(entries: MetricEntries, acquired_at: SystemTime) -> Self {
        Self {
            entries,
            acquired_at,
        }
    }

    pub fn entries(&self) -> &MetricEntries {
        &self.entries
    }

    /// When the underlying data was acquired.
    pub fn acquired_at(&self) -> SystemTime {
        self.acquired_at
    }

    /// Age relative to `now`; zero if `acquired_at` lies in the future.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.acquired_at).unwrap_or_default()
    }

    /// Render as exposition text, one `name value` line per entry.
    pub fn render(&self) -> String {
        let mut output = String::with_capacity(self.entries.len() * 64);
        for (name, value) in &self.entries {
            writeln!(output, "{} {}", name, value).ok();
        }
        output
    }
}

/// Holder of the currently published snapshot.
///
/// The snapshot sits behind an `Arc` that is swapped as a whole, so a reader
/// keeps a consistent snapshot for as long as it holds the `Arc`, even while a
/// newer one is published.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: RwLock<Option<Arc<MetricsSnapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot.
    ///
    /// Returns `false`, leaving the current snapshot untouched, when `entries`
    /// holds fewer than [`MIN_PUBLISHED_ENTRIES`].
    pub fn publish(&self, entries: MetricEntries, acquired_at: SystemTime) -> bool {
        if entries.len() < MIN_PUBLISHED_ENTRIES {
            debug!(entries = entries.len(), "Refusing to publish degenerate snapshot");
            return false;
        }

        let snapshot = Arc::new(MetricsSnapshot::new(entries, acquired_at));
        *self.current.write() = Some(snapshot);
        true
    }

    /// The published snapshot, if any.
    pub fn current(&self) -> Option<Arc<MetricsSnapshot>> {
        self.current.read().clone()
    }

    /// Drop the published snapshot if it is older than `threshold` at `now`.
    /// Returns whether a snapshot was dropped.
    pub fn invalidate_if_stale(&self, now: SystemTime, threshold: Duration) -> bool {
        let mut current = self.current.write();
        let age = match current.as_ref() {
            Some(snapshot) => snapshot.age(now),
            None => return false,
        };

        if age > threshold {
            info!(age_secs = age.as_secs_f64(), "Metrics are now stale");
            *current = None;
            true
        } else {
            false
        }
    }
}
