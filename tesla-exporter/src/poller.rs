//! Adaptive vehicle polling loop.
//!
//! Each cycle:
//! 1. beats the liveness heartbeat,
//! 2. lists the vehicle; fetches its data if online, or wakes it once it has
//!    been unreachable for longer than `sleep_allowed_secs`,
//! 3. reloads the cached data file if it changed, flattens it and publishes a
//!    new snapshot, picking the next interval from the drive state,
//! 4. drops the published snapshot once it is stale,
//! 5. sleeps until `previous cycle start + interval` (no catch-up on overrun).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tesla_common::{TelemetryValue, VehicleStatus};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::VehicleDataCache;
use crate::client::{ApiError, VehicleApiClient};
use crate::config::{ExporterConfig, PollingConfig};
use crate::mapping::flatten;
use crate::state::SharedState;

/// What happened during one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Vehicle found by the list call, if any.
    pub vehicle: Option<VehicleStatus>,
    /// Vehicle data was requested.
    pub fetched: bool,
    /// A wake request was sent.
    pub woke: bool,
    /// A new snapshot was published.
    pub published: bool,
    /// The published snapshot was dropped as stale.
    pub invalidated: bool,
    /// Interval until the next cycle.
    pub interval: Duration,
}

/// The polling scheduler. Sole writer of the shared state.
pub struct VehiclePoller {
    client: VehicleApiClient,
    cache: VehicleDataCache,
    state: SharedState,
    polling: PollingConfig,
    prefix: String,
    interval: Duration,
    last_load_age: Option<SystemTime>,
    last_online: Option<SystemTime>,
}

impl VehiclePoller {
    /// Create a poller. The current cache file is treated as already loaded;
    /// only a newer one is published.
    pub fn new(
        client: VehicleApiClient,
        cache: VehicleDataCache,
        state: SharedState,
        config: &ExporterConfig,
    ) -> Self {
        let last_load_age = cache.age();
        Self {
            client,
            cache,
            state,
            polling: config.polling.clone(),
            prefix: config.metrics.prefix.clone(),
            interval: config.polling.check_interval(),
            last_load_age,
            last_online: None,
        }
    }

    /// Current poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the polling loop. Returns only on a fatal storage error.
    pub async fn run(mut self) -> Result<(), ApiError> {
        info!(
            interval_secs = self.interval.as_secs(),
            prefix = %self.prefix,
            "Starting vehicle poller"
        );

        let mut cycle_start = Instant::now();
        loop {
            let report = self.run_cycle(SystemTime::now()).await?;
            debug!(?report, "Cycle complete");

            let now = Instant::now();
            let next = next_cycle_start(cycle_start, report.interval, now);
            if next > now {
                info!(
                    sleep_secs = (next - now).as_secs_f64(),
                    "Cycle ended, sleeping"
                );
                tokio::time::sleep_until(next).await;
            } else {
                debug!(
                    overrun_secs = now
                        .saturating_duration_since(cycle_start + report.interval)
                        .as_secs_f64(),
                    "Cycle overran its interval"
                );
            }
            cycle_start = next;
        }
    }

    /// Perform a single poll cycle at wall-clock time `now`.
    pub async fn run_cycle(&mut self, now: SystemTime) -> Result<CycleReport, ApiError> {
        self.state.heartbeat.beat_at(timestamp_millis(now));

        let mut report = CycleReport {
            vehicle: None,
            fetched: false,
            woke: false,
            published: false,
            invalidated: false,
            interval: self.interval,
        };

        let vehicle = self.client.list_vehicle().await?;
        report.vehicle = vehicle;

        match vehicle {
            Some(v) if v.is_online() => {
                self.last_online = Some(now);
                self.client.fetch_vehicle_data(v.id).await?;
                report.fetched = true;
            }
            Some(v) => {
                let unreachable_for = self.unreachable_for(now);
                info!(
                    id = v.id,
                    state = %v.state,
                    unreachable_secs = unreachable_for.map(|d| d.as_secs()),
                    allowed_secs = self.polling.sleep_allowed_secs,
                    "Vehicle not online"
                );
                if should_wake(unreachable_for, self.polling.sleep_allowed()) {
                    self.client.wake_vehicle(v.id).await?;
                    report.woke = true;
                }
            }
            None => debug!("No vehicle identified this cycle"),
        }

        let age = self.cache.age();
        if age > self.last_load_age {
            if let Some(age) = age {
                report.published = self.reload(age);
            }
        }

        // Age is measured from the last published load. A newer file that could
        // not be published does not keep the current snapshot alive.
        report.invalidated = self
            .state
            .snapshots
            .invalidate_if_stale(SystemTime::now(), self.polling.stale_threshold());
        report.interval = self.interval;

        Ok(report)
    }

    /// Time since the vehicle was last seen online; `None` if never.
    fn unreachable_for(&self, now: SystemTime) -> Option<Duration> {
        self.last_online
            .map(|t| now.duration_since(t).unwrap_or_default())
    }

    /// Load, flatten and publish the cache file written at `age`.
    fn reload(&mut self, age: SystemTime) -> bool {
        let Some(tree) = self.cache.load() else {
            return false;
        };
        let Some(response) = online_response(&tree) else {
            debug!("Cached vehicle data is not from an online vehicle, skipping");
            return false;
        };

        let entries = flatten(response, &self.prefix);
        let count = entries.len();
        if !self.state.snapshots.publish(entries, age) {
            debug!(entries = count, "Too few metrics in vehicle data, keeping previous");
            return false;
        }

        self.last_load_age = Some(age);
        self.interval = select_interval(response, &self.polling);
        info!(
            entries = count,
            age_secs = SystemTime::now()
                .duration_since(age)
                .unwrap_or_default()
                .as_secs_f64(),
            interval_secs = self.interval.as_secs(),
            "Metrics loaded"
        );
        true
    }
}

/// Start of the cycle after one that started at `previous`: one interval
/// later, or `now` if that instant has already passed. Missed cycles are
/// dropped, so an overrun shifts the phase instead of causing a burst.
pub fn next_cycle_start(previous: Instant, interval: Duration, now: Instant) -> Instant {
    (previous + interval).max(now)
}

/// The `response` member of a vehicle data document whose state is online.
pub fn online_response(tree: &TelemetryValue) -> Option<&TelemetryValue> {
    let response = tree.get("response")?;
    let state = response.get("state")?.as_str()?;
    (state == "online").then_some(response)
}

/// Poll interval following a load: the drive interval while in drive.
pub fn select_interval(response: &TelemetryValue, polling: &PollingConfig) -> Duration {
    let shift_state = response
        .lookup(&["drive_state", "shift_state"])
        .and_then(TelemetryValue::as_str);

    if shift_state == Some("D") {
        polling.drive_interval()
    } else {
        polling.check_interval()
    }
}

/// Whether a vehicle unreachable for `unreachable_for` (`None`: never seen
/// online) should be woken.
pub fn should_wake(unreachable_for: Option<Duration>, allowed: Duration) -> bool {
    unreachable_for.is_none_or(|d| d > allowed)
}

fn timestamp_millis(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
