// Control endpoints
//
// One method per device action. All return the raw `data` acknowledgement
// (usually `null`); a vendor rejection surfaces as `TransportError::Api`.

use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::client::CloudClient;
use crate::error::TransportError;
use crate::models::MaintenanceKey;

/// Fountain water dispensing mode (`useWaterType` on the wire).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WaterMode {
    /// Pump runs continuously.
    Constant,
    /// Pump runs `duration` minutes every `interval` minutes.
    Intermittent,
}

impl WaterMode {
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Constant => 0,
            Self::Intermittent => 1,
        }
    }

    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Constant),
            1 => Some(Self::Intermittent),
            _ => None,
        }
    }
}

impl CloudClient {
    // ── Feeding ──────────────────────────────────────────────────────

    /// Dispense `portions` immediately.
    ///
    /// `POST /device/device/manualFeeding`
    pub async fn manual_feed(&self, serial: &str, portions: u8) -> Result<Value, TransportError> {
        debug!(serial, portions, "manual feed");
        self.post(
            "/device/device/manualFeeding",
            &json!({
                "deviceSn": serial,
                "grainNum": portions,
                "requestId": Uuid::new_v4().simple().to_string(),
            }),
        )
        .await
    }

    /// `POST /device/setting/updateFeedingPlanSwitch`
    pub async fn set_feeding_plan(&self, serial: &str, enable: bool) -> Result<Value, TransportError> {
        debug!(serial, enable, "feeding plan switch");
        self.post(
            "/device/setting/updateFeedingPlanSwitch",
            &json!({ "deviceSn": serial, "enable": enable }),
        )
        .await
    }

    // ── Switches ─────────────────────────────────────────────────────

    /// `POST /device/setting/updateChildLockSwitch`
    pub async fn set_child_lock(&self, serial: &str, enable: bool) -> Result<Value, TransportError> {
        debug!(serial, enable, "child lock switch");
        self.post(
            "/device/setting/updateChildLockSwitch",
            &json!({ "deviceSn": serial, "enable": enable }),
        )
        .await
    }

    /// `POST /device/setting/updateLightSwitch`
    pub async fn set_light_switch(&self, serial: &str, enable: bool) -> Result<Value, TransportError> {
        debug!(serial, enable, "light switch");
        self.post(
            "/device/setting/updateLightSwitch",
            &json!({ "deviceSn": serial, "enable": enable }),
        )
        .await
    }

    /// `POST /device/setting/updateSoundSwitch`
    pub async fn set_sound_switch(&self, serial: &str, enable: bool) -> Result<Value, TransportError> {
        debug!(serial, enable, "sound switch");
        self.post(
            "/device/setting/updateSoundSwitch",
            &json!({ "deviceSn": serial, "enable": enable }),
        )
        .await
    }

    /// `POST /device/setting/updateVideoRecordSwitch`
    pub async fn set_video_record(&self, serial: &str, enable: bool) -> Result<Value, TransportError> {
        debug!(serial, enable, "video record switch");
        self.post(
            "/device/setting/updateVideoRecordSwitch",
            &json!({ "deviceSn": serial, "videoRecordSwitch": enable }),
        )
        .await
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Speaker volume, 1–100.
    ///
    /// `POST /device/setting/updateVolumeSetting`
    pub async fn set_volume(&self, serial: &str, volume: u8) -> Result<Value, TransportError> {
        debug!(serial, volume, "volume");
        self.post(
            "/device/setting/updateVolumeSetting",
            &json!({ "deviceSn": serial, "volume": volume }),
        )
        .await
    }

    /// Seconds before the food lid closes, 1–10.
    ///
    /// `POST /device/setting/updateCoverCloseTime`
    pub async fn set_lid_close_time(&self, serial: &str, seconds: u8) -> Result<Value, TransportError> {
        debug!(serial, seconds, "lid close time");
        self.post(
            "/device/setting/updateCoverCloseTime",
            &json!({ "deviceSn": serial, "closeDoorTimeSec": seconds }),
        )
        .await
    }

    /// Dispensing mode plus its schedule. The endpoint always takes all
    /// three values, so callers pass the current interval and duration
    /// when changing only one of them.
    ///
    /// `POST /device/setting/updateWaterDispensingMode`
    pub async fn set_water_dispensing(
        &self,
        serial: &str,
        mode: WaterMode,
        interval_min: u16,
        duration_min: u16,
    ) -> Result<Value, TransportError> {
        debug!(serial, %mode, interval_min, duration_min, "water dispensing");
        self.post(
            "/device/setting/updateWaterDispensingMode",
            &json!({
                "deviceSn": serial,
                "useWaterType": mode.wire_value(),
                "useWaterInterval": interval_min,
                "useWaterDuration": duration_min,
            }),
        )
        .await
    }

    // ── Maintenance ──────────────────────────────────────────────────

    /// Replacement/cleaning reminder cycle in days, 1–60.
    ///
    /// `POST /device/device/maintenanceFrequencySetting`
    pub async fn set_maintenance_cycle(
        &self,
        serial: &str,
        key: MaintenanceKey,
        days: u8,
    ) -> Result<Value, TransportError> {
        debug!(serial, %key, days, "maintenance cycle");
        self.post(
            "/device/device/maintenanceFrequencySetting",
            &json!({ "deviceSn": serial, "key": key, "frequency": days }),
        )
        .await
    }

    /// Restart the countdown for a consumable.
    ///
    /// `POST /device/device/desiccantReset`, `/device/device/filterReset`
    /// or `/device/device/machineCleaningReset`
    pub async fn reset_maintenance(
        &self,
        serial: &str,
        key: MaintenanceKey,
    ) -> Result<Value, TransportError> {
        let path = match key {
            MaintenanceKey::Desiccant => "/device/device/desiccantReset",
            MaintenanceKey::FilterElement => "/device/device/filterReset",
            MaintenanceKey::MachineCleaning => "/device/device/machineCleaningReset",
        };
        debug!(serial, %key, "maintenance reset");
        self.post(path, &json!({ "deviceSn": serial })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_mode_wire_values() {
        assert_eq!(WaterMode::Constant.wire_value(), 0);
        assert_eq!(WaterMode::from_wire(1), Some(WaterMode::Intermittent));
        assert_eq!(WaterMode::from_wire(7), None);
        assert_eq!("Intermittent".parse::<WaterMode>().ok(), Some(WaterMode::Intermittent));
    }
}
