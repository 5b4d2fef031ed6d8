// ── Snapshot store ──
//
// Latest known state per device. Writes from the polling cycle and from
// out-of-band refreshes may race; each write carries the instant its fetch
// started and an older observation never replaces a newer one.

pub(crate) mod collection;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use petlibro_api::TransportError;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::model::{Device, DeviceSerial, DeviceState};
use crate::stream::Subscription;
use collection::EntityCollection;

/// Point-in-time view of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub device: Arc<Device>,
    /// Last successfully decoded state. Kept across transport failures.
    pub state: Option<DeviceState>,
    /// `false` after a decode failure, or before the first good read.
    pub available: bool,
    pub last_error: Option<String>,
    /// When the fetch behind this snapshot started.
    pub observed_at: DateTime<Utc>,
    /// When this snapshot was written.
    pub updated_at: DateTime<Utc>,
}

impl DeviceSnapshot {
    pub fn serial(&self) -> &DeviceSerial {
        &self.device.serial
    }
}

/// Result of a write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Applied,
    /// A newer observation was already stored.
    Stale,
    /// The state's class does not match the device's class.
    Rejected,
}

/// Reactive per-device snapshot storage.
pub struct SnapshotStore {
    snapshots: EntityCollection<DeviceSnapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: EntityCollection::new(),
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Store a freshly decoded state.
    pub fn publish_state(
        &self,
        device: Arc<Device>,
        state: DeviceState,
        observed_at: DateTime<Utc>,
    ) -> PublishOutcome {
        if state.class() != device.class {
            warn!(
                serial = %device.serial,
                device_class = %device.class,
                state_class = %state.class(),
                "refusing state of a different class"
            );
            return PublishOutcome::Rejected;
        }

        self.write(&device.serial, observed_at, |_| DeviceSnapshot {
            device: Arc::clone(&device),
            state: Some(state),
            available: true,
            last_error: None,
            observed_at,
            updated_at: Utc::now(),
        })
    }

    /// The payload could not be decoded: mark the device unavailable.
    /// The last good state stays attached for reference.
    pub fn mark_unavailable(
        &self,
        device: Arc<Device>,
        error: &DecodeError,
        observed_at: DateTime<Utc>,
    ) -> PublishOutcome {
        self.write(&device.serial, observed_at, |prev| DeviceSnapshot {
            device: Arc::clone(&device),
            state: prev.and_then(|p| p.state.clone()),
            available: false,
            last_error: Some(error.to_string()),
            observed_at,
            updated_at: Utc::now(),
        })
    }

    /// The fetch failed: keep the previous state and availability, record
    /// the error.
    pub fn record_error(
        &self,
        device: Arc<Device>,
        error: &TransportError,
        observed_at: DateTime<Utc>,
    ) -> PublishOutcome {
        self.write(&device.serial, observed_at, |prev| DeviceSnapshot {
            device: Arc::clone(&device),
            state: prev.and_then(|p| p.state.clone()),
            available: prev.is_some_and(|p| p.available),
            last_error: Some(error.to_string()),
            observed_at,
            updated_at: Utc::now(),
        })
    }

    /// Drop snapshots of devices no longer listed.
    pub fn retain_devices(&self, serials: &[DeviceSerial]) -> Vec<String> {
        let removed = self
            .snapshots
            .retain(|key| serials.iter().any(|s| s.as_str() == key));
        if !removed.is_empty() {
            debug!(?removed, "pruned snapshots of removed devices");
        }
        removed
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, serial: &DeviceSerial) -> Option<Arc<DeviceSnapshot>> {
        self.snapshots.get(serial.as_str())
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<DeviceSnapshot>>> {
        self.snapshots.snapshot()
    }

    pub fn subscribe(&self) -> Subscription<DeviceSnapshot> {
        Subscription::new(self.snapshots.subscribe())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Mutation counter; bumps on every applied write.
    pub fn version(&self) -> u64 {
        self.snapshots.version()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Last-writer-wins by observation time, serialized per device.
    fn write(
        &self,
        serial: &DeviceSerial,
        observed_at: DateTime<Utc>,
        build: impl FnOnce(Option<&DeviceSnapshot>) -> DeviceSnapshot,
    ) -> PublishOutcome {
        let stored = self.snapshots.upsert_with(serial.to_string(), |prev| {
            if prev.is_some_and(|p| p.observed_at > observed_at) {
                return None;
            }
            Some(build(prev.map(|p| &**p)))
        });

        if stored.is_some() {
            PublishOutcome::Applied
        } else {
            debug!(%serial, %observed_at, "discarding stale observation");
            PublishOutcome::Stale
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceClass, FountainState};
    use chrono::Duration;
    use petlibro_api::RawDevice;
    use serde_json::json;

    fn fountain() -> Arc<Device> {
        let raw: RawDevice = serde_json::from_value(json!({
            "deviceSn": "WF-1",
            "productIdentifier": "PLWF105",
            "online": true
        }))
        .unwrap();
        Arc::new(Device::from_raw(&raw))
    }

    fn fountain_state(level: u32) -> DeviceState {
        DeviceState::Fountain(FountainState {
            common: crate::model::CommonState::default(),
            water_level: level,
            water_weight: None,
            pump_state: None,
            filter_remaining_days: None,
            cleaning_remaining_days: None,
            today_water_ml: None,
            water_mode: None,
            water_interval_min: None,
            water_duration_min: None,
            filter_cycle_days: None,
            cleaning_cycle_days: None,
            light: None,
            sound: None,
        })
    }

    fn level(store: &SnapshotStore, device: &Device) -> Option<u32> {
        store
            .get(&device.serial)?
            .state
            .as_ref()?
            .fountain()
            .map(|f| f.water_level)
    }

    #[test]
    fn newer_observation_wins() {
        let store = SnapshotStore::new();
        let device = fountain();
        let t0 = Utc::now();

        assert_eq!(
            store.publish_state(device.clone(), fountain_state(50), t0),
            PublishOutcome::Applied
        );
        assert_eq!(
            store.publish_state(device.clone(), fountain_state(10), t0 - Duration::seconds(5)),
            PublishOutcome::Stale
        );
        assert_eq!(level(&store, &device), Some(50));

        assert_eq!(
            store.publish_state(device.clone(), fountain_state(90), t0 + Duration::seconds(1)),
            PublishOutcome::Applied
        );
        assert_eq!(level(&store, &device), Some(90));
    }

    #[test]
    fn mismatched_class_is_rejected() {
        let store = SnapshotStore::new();
        let device = fountain();
        let state = DeviceState::Unclassified(crate::model::CommonState::default());
        assert_eq!(state.class(), DeviceClass::Unclassified);
        assert_eq!(
            store.publish_state(device, state, Utc::now()),
            PublishOutcome::Rejected
        );
        assert!(store.is_empty());
    }

    #[test]
    fn transport_error_keeps_previous_state() {
        let store = SnapshotStore::new();
        let device = fountain();
        let t0 = Utc::now();
        store.publish_state(device.clone(), fountain_state(70), t0);

        store.record_error(
            device.clone(),
            &TransportError::RateLimited { retry_after_secs: 60 },
            t0 + Duration::seconds(60),
        );

        let snap = store.get(&device.serial).unwrap();
        assert!(snap.available);
        assert_eq!(level(&store, &device), Some(70));
        assert!(snap.last_error.as_deref().unwrap().contains("60"));
    }

    #[test]
    fn first_transport_error_is_unavailable() {
        let store = SnapshotStore::new();
        let device = fountain();
        store.record_error(
            device.clone(),
            &TransportError::RateLimited { retry_after_secs: 5 },
            Utc::now(),
        );
        let snap = store.get(&device.serial).unwrap();
        assert!(!snap.available);
        assert!(snap.state.is_none());
    }

    #[test]
    fn decode_error_marks_unavailable() {
        let store = SnapshotStore::new();
        let device = fountain();
        let t0 = Utc::now();
        store.publish_state(device.clone(), fountain_state(70), t0);
        store.mark_unavailable(
            device.clone(),
            &DecodeError::MissingField { field: "water_level" },
            t0 + Duration::seconds(1),
        );

        let snap = store.get(&device.serial).unwrap();
        assert!(!snap.available);
        assert_eq!(
            snap.last_error.as_deref(),
            Some("required field `water_level` is missing")
        );
    }

    #[test]
    fn retain_prunes_removed_devices() {
        let store = SnapshotStore::new();
        let device = fountain();
        store.publish_state(device, fountain_state(1), Utc::now());
        assert_eq!(store.retain_devices(&[]), vec!["WF-1".to_owned()]);
        assert!(store.snapshot().is_empty());
    }
}
