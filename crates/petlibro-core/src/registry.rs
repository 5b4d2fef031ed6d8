// ── Device registry ──
//
// The set of devices bound to the account, reconciled against the cloud
// listing. Unchanged devices keep their `Arc` across discoveries.

use std::collections::HashSet;
use std::sync::Arc;

use petlibro_api::{CloudClient, RawDevice, TransportError};
use tracing::{debug, info, warn};

use crate::model::{Device, DeviceClass, DeviceSerial};
use crate::store::collection::EntityCollection;
use crate::stream::Subscription;

/// What a discovery pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryDiff {
    pub added: Vec<DeviceSerial>,
    pub removed: Vec<DeviceSerial>,
    /// Devices listed before and after, whether or not their metadata changed.
    pub retained: usize,
    /// Retained devices whose listing metadata changed.
    pub updated: usize,
}

impl DiscoveryDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated == 0
    }
}

pub struct DeviceRegistry {
    devices: EntityCollection<Device>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: EntityCollection::new(),
        }
    }

    /// List the account's devices and reconcile the registry with them.
    pub async fn discover(
        &self,
        client: &CloudClient,
    ) -> Result<Arc<Vec<Arc<Device>>>, TransportError> {
        let listing = client.list_devices().await?;
        let diff = self.reconcile(&listing);

        if diff.is_unchanged() {
            debug!(devices = self.devices.len(), "discovery: no changes");
        } else {
            info!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                retained = diff.retained,
                updated = diff.updated,
                "discovery reconciled"
            );
        }
        Ok(self.snapshot())
    }

    /// Apply one listing. Entries without a serial are skipped; duplicate
    /// serials keep the first entry.
    pub fn reconcile(&self, listing: &[RawDevice]) -> DiscoveryDiff {
        let mut diff = DiscoveryDiff::default();
        let mut seen = HashSet::new();

        for raw in listing {
            let device = Device::from_raw(raw);
            if device.serial.as_str().is_empty() {
                warn!(product = ?raw.product_identifier, "skipping listed device without a serial");
                continue;
            }
            if !seen.insert(device.serial.clone()) {
                debug!(serial = %device.serial, "duplicate serial in listing, keeping first");
                continue;
            }
            if device.class == DeviceClass::Unclassified {
                debug!(
                    serial = %device.serial,
                    product = ?device.product_identifier,
                    "unrecognized product, exposing as unclassified"
                );
            }

            match self.devices.get(device.serial.as_str()) {
                Some(existing) if *existing == device => diff.retained += 1,
                Some(_) => {
                    diff.retained += 1;
                    diff.updated += 1;
                    self.devices
                        .upsert(device.serial.to_string(), Arc::new(device));
                }
                None => {
                    diff.added.push(device.serial.clone());
                    self.devices
                        .upsert(device.serial.to_string(), Arc::new(device));
                }
            }
        }

        diff.removed = self
            .devices
            .retain(|key| seen.iter().any(|s| s.as_str() == key))
            .into_iter()
            .map(DeviceSerial::new)
            .collect();

        diff
    }

    pub fn get(&self, serial: &DeviceSerial) -> Option<Arc<Device>> {
        self.devices.get(serial.as_str())
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    pub fn subscribe(&self) -> Subscription<Device> {
        Subscription::new(self.devices.subscribe())
    }

    pub fn serials(&self) -> Vec<DeviceSerial> {
        self.snapshot().iter().map(|d| d.serial.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
