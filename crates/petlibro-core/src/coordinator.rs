// ── Polling coordinator ──
//
// Drives fetch → decode → publish for every registered device on a fixed
// period. Cycles never overlap; a device's failure stays with that device.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use petlibro_api::CloudClient;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decode::decode;
use crate::error::CoreError;
use crate::fetch::fetch_payload;
use crate::model::{Device, DeviceSerial};
use crate::registry::DeviceRegistry;
use crate::store::{PublishOutcome, SnapshotStore};

/// Default time between cycle starts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorPhase {
    Idle,
    Polling,
}

/// Aggregate result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CycleStatus {
    /// Every device refreshed.
    Ok,
    /// Some devices failed.
    Partial,
    /// Every device failed; previous snapshots remain visible.
    Failed,
    /// No devices registered.
    Empty,
}

/// What happened to one device during a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum DeviceOutcome {
    Updated,
    /// A newer observation landed first (an out-of-band refresh).
    Superseded,
    DecodeFailed(String),
    TransportFailed(String),
}

impl DeviceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DecodeFailed(_) | Self::TransportFailed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub status: CycleStatus,
    pub devices: Vec<(DeviceSerial, DeviceOutcome)>,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.devices.iter().filter(|(_, o)| o.is_failure()).count()
    }
}

fn cycle_status(outcomes: &[(DeviceSerial, DeviceOutcome)]) -> CycleStatus {
    let failed = outcomes.iter().filter(|(_, o)| o.is_failure()).count();
    match failed {
        _ if outcomes.is_empty() => CycleStatus::Empty,
        0 => CycleStatus::Ok,
        n if n == outcomes.len() => CycleStatus::Failed,
        _ => CycleStatus::Partial,
    }
}

pub struct PollingCoordinator {
    client: CloudClient,
    registry: Arc<DeviceRegistry>,
    store: Arc<SnapshotStore>,
    period: Duration,
    /// Re-run discovery every N cycles; 0 keeps the setup-time device set.
    rediscover_every: u32,
    cycle_lock: Mutex<()>,
    cycles: AtomicU64,
    phase: watch::Sender<CoordinatorPhase>,
    reports: watch::Sender<Option<Arc<CycleReport>>>,
}

impl PollingCoordinator {
    pub fn new(
        client: CloudClient,
        registry: Arc<DeviceRegistry>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        let (phase, _) = watch::channel(CoordinatorPhase::Idle);
        let (reports, _) = watch::channel(None);
        Self {
            client,
            registry,
            store,
            period: DEFAULT_POLL_INTERVAL,
            rediscover_every: 0,
            cycle_lock: Mutex::new(()),
            cycles: AtomicU64::new(0),
            phase,
            reports,
        }
    }

    /// Time between cycle starts. Zero disables scheduled polling.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_rediscovery(mut self, every_cycles: u32) -> Self {
        self.rediscover_every = every_cycles;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn phase(&self) -> watch::Receiver<CoordinatorPhase> {
        self.phase.subscribe()
    }

    /// Latest cycle report; `None` until the first cycle completes.
    pub fn reports(&self) -> watch::Receiver<Option<Arc<CycleReport>>> {
        self.reports.subscribe()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    // ── Cycles ───────────────────────────────────────────────────────

    /// Run one full cycle. Waits for a cycle already in progress.
    pub async fn run_cycle(&self) -> Arc<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;
        let _phase = PhaseGuard::enter(&self.phase);

        let cycle = self.cycles.load(Ordering::SeqCst) + 1;
        let started_at = Utc::now();
        let start = Instant::now();

        if self.rediscover_every > 0 && cycle > 1 && (cycle - 1) % u64::from(self.rediscover_every) == 0 {
            self.rediscover().await;
        }

        let devices = self.registry.snapshot();
        let results = join_all(devices.iter().map(|d| self.poll_device(Arc::clone(d)))).await;
        let outcomes: Vec<(DeviceSerial, DeviceOutcome)> = devices
            .iter()
            .map(|d| d.serial.clone())
            .zip(results)
            .collect();

        let report = Arc::new(CycleReport {
            cycle,
            started_at,
            duration: start.elapsed(),
            status: cycle_status(&outcomes),
            devices: outcomes,
        });
        self.cycles.store(cycle, Ordering::SeqCst);

        match report.status {
            CycleStatus::Failed => warn!(
                cycle,
                devices = report.devices.len(),
                "every device failed this cycle, keeping previous snapshots"
            ),
            CycleStatus::Partial => info!(
                cycle,
                failed = report.failures(),
                devices = report.devices.len(),
                "cycle completed with failures"
            ),
            CycleStatus::Ok | CycleStatus::Empty => debug!(
                cycle,
                devices = report.devices.len(),
                elapsed = ?report.duration,
                "cycle completed"
            ),
        }

        self.reports.send_replace(Some(Arc::clone(&report)));
        report
    }

    /// Refresh one device outside the schedule.
    pub async fn refresh_device(&self, serial: &DeviceSerial) -> Result<DeviceOutcome, CoreError> {
        let device = self
            .registry
            .get(serial)
            .ok_or_else(|| CoreError::DeviceNotFound {
                serial: serial.to_string(),
            })?;
        debug!(%serial, "out-of-band refresh");
        Ok(self.poll_device(device).await)
    }

    /// Scheduled loop. Cycles start on a fixed grid; a tick missed because
    /// a cycle overran is skipped, never queued. The first cycle runs one
    /// period after start (setup performs the initial one).
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if self.period.is_zero() {
            info!("scheduled polling disabled");
            return;
        }

        info!(period_secs = self.period.as_secs(), "polling started");
        let this: &Self = &self;
        schedule(self.period, &cancel, || this.run_cycle()).await;
        info!("polling stopped");
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn rediscover(&self) {
        match self.registry.discover(&self.client).await {
            Ok(devices) => {
                let serials: Vec<DeviceSerial> = devices.iter().map(|d| d.serial.clone()).collect();
                self.store.retain_devices(&serials);
            }
            Err(e) => warn!(error = %e, "re-discovery failed, polling known devices"),
        }
    }

    async fn poll_device(&self, device: Arc<Device>) -> DeviceOutcome {
        let observed_at = Utc::now();
        let serial = device.serial.clone();

        let payload = match fetch_payload(&self.client, &device).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%serial, error = %e, "device fetch failed");
                self.store.record_error(device, &e, observed_at);
                return DeviceOutcome::TransportFailed(e.to_string());
            }
        };

        match decode(device.class, &payload) {
            Ok(state) => match self.store.publish_state(device, state, observed_at) {
                PublishOutcome::Applied => DeviceOutcome::Updated,
                PublishOutcome::Stale => DeviceOutcome::Superseded,
                PublishOutcome::Rejected => {
                    DeviceOutcome::DecodeFailed("decoded state has the wrong class".into())
                }
            },
            Err(e) => {
                warn!(%serial, error = %e, "device payload could not be decoded");
                self.store.mark_unavailable(device, &e, observed_at);
                DeviceOutcome::DecodeFailed(e.to_string())
            }
        }
    }
}

/// Call `cycle` every `period`, measured from the start of the previous
/// call, until `cancel` fires. Ticks that fall inside a running cycle are
/// dropped. Cancellation also abandons a cycle in flight.
async fn schedule<F, Fut>(period: Duration, cancel: &CancellationToken, mut cycle: F)
where
    F: FnMut() -> Fut,
    Fut: Future,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = cycle() => {}
                }
            }
        }
    }
}

/// Holds the phase at `Polling` and restores `Idle` on drop, including
/// when a cycle is cancelled mid-flight.
struct PhaseGuard<'a> {
    phase: &'a watch::Sender<CoordinatorPhase>,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a watch::Sender<CoordinatorPhase>) -> Self {
        phase.send_replace(CoordinatorPhase::Polling);
        Self { phase }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(CoordinatorPhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run `schedule` with cycles lasting `durations` (seconds, in order;
    /// 1s once exhausted), cancel after `stop_after` seconds and return the
    /// cycle start offsets in whole seconds.
    async fn cycle_starts(period: u64, durations: &[u64], stop_after: u64) -> Vec<u64> {
        let origin = Instant::now();
        let cancel = CancellationToken::new();
        let mut starts = Vec::new();

        let cycles = schedule(Duration::from_secs(period), &cancel, || {
            let next = durations.get(starts.len()).copied().unwrap_or(1);
            starts.push(origin.elapsed().as_secs());
            tokio::time::sleep(Duration::from_secs(next))
        });
        let stop = async {
            tokio::time::sleep(Duration::from_secs(stop_after)).await;
            cancel.cancel();
        };
        tokio::join!(cycles, stop);

        starts
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_start_one_period_apart() {
        assert_eq!(cycle_starts(10, &[3, 3, 3], 35).await, vec![10, 20, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_skips_missed_ticks() {
        // The 25s cycle swallows the ticks at 30 and 40. One late cycle
        // follows at 45, then the grid resumes at 50.
        assert_eq!(cycle_starts(10, &[1, 25, 1, 1], 55).await, vec![10, 20, 45, 50]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_loop_mid_cycle() {
        let origin = Instant::now();
        let starts = cycle_starts(10, &[100], 15).await;

        assert_eq!(starts, vec![10]);
        assert_eq!(origin.elapsed().as_secs(), 15);
    }

    fn outcomes(list: &[DeviceOutcome]) -> Vec<(DeviceSerial, DeviceOutcome)> {
        list.iter()
            .enumerate()
            .map(|(i, o)| (DeviceSerial::new(format!("SN-{i}")), o.clone()))
            .collect()
    }

    #[test]
    fn status_follows_failures() {
        assert_eq!(cycle_status(&[]), CycleStatus::Empty);
        assert_eq!(
            cycle_status(&outcomes(&[DeviceOutcome::Updated, DeviceOutcome::Superseded])),
            CycleStatus::Ok
        );
        assert_eq!(
            cycle_status(&outcomes(&[
                DeviceOutcome::Updated,
                DeviceOutcome::TransportFailed("boom".into())
            ])),
            CycleStatus::Partial
        );
        assert_eq!(
            cycle_status(&outcomes(&[
                DeviceOutcome::DecodeFailed("x".into()),
                DeviceOutcome::TransportFailed("y".into())
            ])),
            CycleStatus::Failed
        );
    }
}
