// ── Device state ──
//
// Typed per-class readings produced by `decode`. Every optional field uses
// `None` as the "unknown" value: the cloud did not report it this cycle.

use chrono::{DateTime, Utc};
use petlibro_api::WaterMode;
use serde::{Deserialize, Serialize};

use super::device::DeviceClass;

/// Decoded state of one device, tagged by class.
///
/// A state's class always equals the class of the device it was decoded
/// for; [`SnapshotStore`](crate::store::SnapshotStore) refuses to publish
/// a mismatched pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum DeviceState {
    Feeder(FeederState),
    CameraFeeder(CameraFeederState),
    RfidFeeder(RfidFeederState),
    Fountain(FountainState),
    RfidFountain(RfidFountainState),
    LitterBox(LitterBoxState),
    Unclassified(CommonState),
}

impl DeviceState {
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::Feeder(_) => DeviceClass::Feeder,
            Self::CameraFeeder(_) => DeviceClass::CameraFeeder,
            Self::RfidFeeder(_) => DeviceClass::RfidFeeder,
            Self::Fountain(_) => DeviceClass::Fountain,
            Self::RfidFountain(_) => DeviceClass::RfidFountain,
            Self::LitterBox(_) => DeviceClass::LitterBox,
            Self::Unclassified(_) => DeviceClass::Unclassified,
        }
    }

    /// Attributes every class carries.
    pub fn common(&self) -> &CommonState {
        match self {
            Self::Feeder(s) => &s.common,
            Self::CameraFeeder(s) => &s.feeder.common,
            Self::RfidFeeder(s) => &s.feeder.common,
            Self::Fountain(s) => &s.common,
            Self::RfidFountain(s) => &s.fountain.common,
            Self::LitterBox(s) => &s.common,
            Self::Unclassified(s) => s,
        }
    }

    /// Feeder readings, for any feeder class.
    pub fn feeder(&self) -> Option<&FeederState> {
        match self {
            Self::Feeder(s) => Some(s),
            Self::CameraFeeder(s) => Some(&s.feeder),
            Self::RfidFeeder(s) => Some(&s.feeder),
            _ => None,
        }
    }

    /// Fountain readings, for any fountain class.
    pub fn fountain(&self) -> Option<&FountainState> {
        match self {
            Self::Fountain(s) => Some(s),
            Self::RfidFountain(s) => Some(&s.fountain),
            _ => None,
        }
    }
}

// ── Shared blocks ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonState {
    pub online: Option<bool>,
    pub wifi_ssid: Option<String>,
    pub wifi_rssi: Option<i64>,
    /// Battery charge in percent, for battery-backed models.
    pub battery_percent: Option<u32>,
    /// Pending firmware update; `None` when up to date or unknown.
    pub firmware_update: Option<FirmwareUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareUpdate {
    pub target_version: Option<String>,
    pub description: Option<String>,
    /// Install progress in percent once the update has started.
    pub progress: Option<u32>,
}

/// A pet bound to an RFID-capable device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfidTag {
    pub pet_id: Option<String>,
    pub pet_name: Option<String>,
    pub tag: Option<String>,
}

/// One recognized pet visit (a meal or a drink).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetVisit {
    pub pet_id: Option<String>,
    pub pet_name: Option<String>,
    pub at: DateTime<Utc>,
    pub duration_secs: Option<u32>,
    /// Grams eaten or millilitres drunk, per device kind.
    pub amount: Option<f64>,
}

// ── Feeders ─────────────────────────────────────────────────────────

/// A meal from today's feeding plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMeal {
    /// Local wall-clock time, as the cloud reports it (`HH:MM`).
    pub time: Option<String>,
    pub portions: Option<u32>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederState {
    pub common: CommonState,
    /// Food remaining in the hopper, in percent.
    pub food_remaining: u32,
    pub last_feed: Option<DateTime<Utc>>,
    pub feeding_plan_enabled: Option<bool>,
    pub feeding_plan_today: Option<Vec<PlannedMeal>>,
    pub today_feeding_quantity: Option<u32>,
    pub today_feeding_times: Option<u32>,
    pub food_low: Option<bool>,
    pub dispenser_blocked: Option<bool>,
    pub battery_state: Option<String>,
    pub child_lock: Option<bool>,
    pub light: Option<bool>,
    pub sound: Option<bool>,
    pub volume: Option<u32>,
    pub lid_close_time_secs: Option<u32>,
    pub desiccant_remaining_days: Option<u32>,
    pub desiccant_cycle_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraState {
    pub resolution: Option<String>,
    pub night_vision: Option<String>,
    pub video_record: Option<bool>,
    pub video_record_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFeederState {
    pub feeder: FeederState,
    pub camera: CameraState,
    /// Live streaming is not supported by the bridge; always `false`.
    pub stream_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfidFeederState {
    pub feeder: FeederState,
    pub rfid_tags: Vec<RfidTag>,
    pub visits: Vec<PetVisit>,
}

// ── Fountains ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FountainState {
    pub common: CommonState,
    /// Water remaining in the tank, in percent.
    pub water_level: u32,
    pub water_weight: Option<f64>,
    /// Pump running state as reported (`RUNNING`, `IDLE`, ...).
    pub pump_state: Option<String>,
    pub filter_remaining_days: Option<u32>,
    pub cleaning_remaining_days: Option<u32>,
    pub today_water_ml: Option<u32>,
    pub water_mode: Option<WaterMode>,
    pub water_interval_min: Option<u32>,
    pub water_duration_min: Option<u32>,
    pub filter_cycle_days: Option<u32>,
    pub cleaning_cycle_days: Option<u32>,
    pub light: Option<bool>,
    pub sound: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfidFountainState {
    pub fountain: FountainState,
    pub rfid_tags: Vec<RfidTag>,
    pub visits: Vec<PetVisit>,
}

// ── Litter boxes ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitterBoxState {
    pub common: CommonState,
    /// Waste drawer fill level, in percent.
    pub waste_level: u32,
    pub litter_weight: Option<f64>,
    pub odor_level: Option<u32>,
    pub filter_remaining_days: Option<u32>,
    pub litter_remaining_days: Option<u32>,
    pub times_used_today: Option<u32>,
    pub last_used: Option<DateTime<Utc>>,
    pub auto_clean: Option<bool>,
    pub cleaning_interval_min: Option<u32>,
}
