// ── Command dispatcher ──
//
// Capability check → parameter check → cloud call → out-of-band refresh.
// Nothing reaches the network unless the first two pass.

use std::sync::Arc;

use chrono::Utc;
use petlibro_api::{CloudClient, MaintenanceKey, WaterMode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Ack, Action, ActionKind, WATER_MINUTES, capability};
use crate::coordinator::PollingCoordinator;
use crate::error::CommandError;
use crate::model::{Device, DeviceSerial, DeviceState};

pub struct CommandDispatcher {
    coordinator: Arc<PollingCoordinator>,
    cancel: CancellationToken,
}

impl CommandDispatcher {
    /// Refreshes spawned after a command stop when `cancel` fires.
    pub fn new(coordinator: Arc<PollingCoordinator>, cancel: CancellationToken) -> Self {
        Self {
            coordinator,
            cancel,
        }
    }

    /// Send `action` to the registered device with `serial`.
    pub async fn send(&self, serial: &DeviceSerial, action: Action) -> Result<Ack, CommandError> {
        let device = self
            .coordinator
            .registry()
            .get(serial)
            .ok_or_else(|| CommandError::UnknownDevice {
                serial: serial.clone(),
            })?;
        self.send_to(&device, action).await
    }

    /// Send `action` to `device`.
    pub async fn send_to(&self, device: &Arc<Device>, action: Action) -> Result<Ack, CommandError> {
        let kind = action.kind();
        if !capability::supports(device.class, kind) {
            debug!(serial = %device.serial, class = %device.class, %kind, "action not supported");
            return Err(CommandError::Unsupported {
                class: device.class,
                action: kind,
            });
        }
        action.validate()?;

        let response = self.invoke(device, action).await.inspect_err(|e| {
            warn!(serial = %device.serial, %kind, error = %e, "command failed");
        })?;
        info!(serial = %device.serial, %kind, "command accepted");

        self.spawn_refresh(device.serial.clone());

        Ok(Ack {
            serial: device.serial.clone(),
            action: kind,
            accepted_at: Utc::now(),
            response,
        })
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn invoke(&self, device: &Device, action: Action) -> Result<Value, CommandError> {
        let client: &CloudClient = self.coordinator.client();
        let sn = device.serial.as_str();

        let result = match action {
            Action::DispenseNow { portions } => client.manual_feed(sn, portions).await,
            Action::SetFeedingPlan { enabled } => client.set_feeding_plan(sn, enabled).await,
            Action::SetChildLock { enabled } => client.set_child_lock(sn, enabled).await,
            Action::SetLight { enabled } => client.set_light_switch(sn, enabled).await,
            Action::SetSound { enabled } => client.set_sound_switch(sn, enabled).await,
            Action::SetVideoRecord { enabled } => client.set_video_record(sn, enabled).await,
            Action::SetVolume { volume } => client.set_volume(sn, volume).await,
            Action::SetLidCloseTime { seconds } => client.set_lid_close_time(sn, seconds).await,
            Action::SetDesiccantCycle { days } => {
                client
                    .set_maintenance_cycle(sn, MaintenanceKey::Desiccant, days)
                    .await
            }
            Action::SetFilterCycle { days } => {
                client
                    .set_maintenance_cycle(sn, MaintenanceKey::FilterElement, days)
                    .await
            }
            Action::SetCleaningCycle { days } => {
                client
                    .set_maintenance_cycle(sn, MaintenanceKey::MachineCleaning, days)
                    .await
            }
            Action::ResetDesiccant => client.reset_maintenance(sn, MaintenanceKey::Desiccant).await,
            Action::ResetFilter => {
                client
                    .reset_maintenance(sn, MaintenanceKey::FilterElement)
                    .await
            }
            Action::ResetCleaning => {
                client
                    .reset_maintenance(sn, MaintenanceKey::MachineCleaning)
                    .await
            }
            Action::SetWaterMode { .. }
            | Action::SetWaterInterval { .. }
            | Action::SetWaterDuration { .. } => {
                let w = self.water_settings(device, action)?;
                client
                    .set_water_dispensing(sn, w.mode, w.interval, w.duration)
                    .await
            }
        };
        Ok(result?)
    }

    /// The dispensing endpoint takes mode, interval and duration together.
    /// Values the action does not change come from the last snapshot; an
    /// unknown or out-of-range value refuses the command.
    fn water_settings(&self, device: &Device, action: Action) -> Result<WaterSettings, CommandError> {
        let kind = action.kind();
        let snapshot = self.coordinator.store().get(&device.serial);
        let current = snapshot
            .as_ref()
            .and_then(|s| s.state.as_ref())
            .and_then(DeviceState::fountain);

        let mode = match action {
            Action::SetWaterMode { mode } => mode,
            _ => current
                .and_then(|f| f.water_mode)
                .unwrap_or(WaterMode::Constant),
        };
        let interval = match action {
            Action::SetWaterInterval { minutes } => minutes,
            _ => known_minutes(kind, "water interval", current.and_then(|f| f.water_interval_min))?,
        };
        let duration = match action {
            Action::SetWaterDuration { minutes } => minutes,
            _ => known_minutes(kind, "water duration", current.and_then(|f| f.water_duration_min))?,
        };

        Ok(WaterSettings {
            mode,
            interval,
            duration,
        })
    }

    fn spawn_refresh(&self, serial: DeviceSerial) {
        let coordinator = Arc::clone(&self.coordinator);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                result = coordinator.refresh_device(&serial) => {
                    if let Err(e) = result {
                        warn!(%serial, error = %e, "post-command refresh failed");
                    }
                }
            }
        });
    }
}

/// Full dispensing triple for `set_water_dispensing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WaterSettings {
    mode: WaterMode,
    interval: u16,
    duration: u16,
}

fn known_minutes(kind: ActionKind, what: &str, value: Option<u32>) -> Result<u16, CommandError> {
    let Some(raw) = value else {
        return Err(CommandError::InvalidParameter {
            action: kind,
            message: format!("current {what} is unknown; wait for the next poll"),
        });
    };
    u16::try_from(raw)
        .ok()
        .filter(|m| WATER_MINUTES.contains(m))
        .ok_or_else(|| CommandError::InvalidParameter {
            action: kind,
            message: format!(
                "current {what} {raw} is outside {}-{} minutes",
                WATER_MINUTES.start(),
                WATER_MINUTES.end()
            ),
        })
}
