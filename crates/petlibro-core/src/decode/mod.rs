// ── Device state decoding ──
//
// Turns the merged cloud payload of one device into a typed `DeviceState`.
// Pure: no I/O, no clock, no logging. The same input always yields the
// same output.

pub(crate) mod reader;

use petlibro_api::WaterMode;
use serde_json::Value;

use crate::error::DecodeError;
use crate::model::{
    CameraFeederState, CameraState, CommonState, DeviceClass, DeviceState, FeederState,
    FirmwareUpdate, FountainState, LitterBoxState, PetVisit, PlannedMeal, RfidFeederState,
    RfidFountainState, RfidTag,
};
use reader::{Field, PayloadReader, require};

// ── Field catalogue ─────────────────────────────────────────────────

mod common {
    use super::Field;
    pub const ONLINE: Field = Field::new("online", &[]);
    pub const WIFI_SSID: Field = Field::new("wifi_ssid", &["wifiSsid"]);
    pub const WIFI_RSSI: Field = Field::new("wifi_rssi", &["wifiRssi"]);
    pub const BATTERY: Field = Field::new("battery_percent", &["electricQuantity", "batteryLevel"]);
    pub const UPGRADE: Field = Field::new("upgrade", &[]);
    pub const HAS_UPGRADE: Field = Field::new("has_upgrade", &["hasUpgrade"]);
    pub const JOB_ITEM: Field = Field::new("job_item_id", &["jobItemId"]);
    pub const TARGET_VERSION: Field =
        Field::new("target_version", &["targetVersion", "latestVersion"]);
    pub const UPGRADE_DESC: Field = Field::new("description", &["upgradeDesc"]);
    pub const PROGRESS: Field = Field::new("progress", &[]);
    pub const LIGHT: Field = Field::new("light", &["lightSwitch", "enableLight"]);
    pub const SOUND: Field = Field::new("sound", &["soundSwitch", "enableSound"]);
}

mod feeder {
    use super::Field;
    pub const FOOD_REMAINING: Field = Field::new("food_remaining", &["foodRemaining", "remainingFood"]);
    pub const LAST_FEED: Field = Field::new("last_feed", &["lastFeed", "lastFeedTime"]);
    pub const PLAN_ENABLED: Field = Field::new("feeding_plan_enabled", &["enableFeedingPlan"]);
    pub const PLAN_TODAY: Field = Field::new("feeding_plan_today", &[]);
    pub const TODAY_QUANTITY: Field = Field::new("today_feeding_quantity", &["todayFeedingQuantity"]);
    pub const TODAY_TIMES: Field = Field::new("today_feeding_times", &["todayFeedingTimes"]);
    pub const FOOD_LOW: Field = Field::new("food_low", &[]);
    /// Inverse of `food_low` on the wire.
    pub const SURPLUS_GRAIN: Field = Field::new("surplusGrain", &[]);
    pub const BLOCKED: Field = Field::new("dispenser_blocked", &[]);
    /// Inverse of `dispenser_blocked` on the wire.
    pub const OUTLET_OK: Field = Field::new("grainOutletState", &[]);
    pub const BATTERY_STATE: Field = Field::new("battery_state", &["batteryState"]);
    pub const CHILD_LOCK: Field = Field::new("child_lock", &["childLockSwitch"]);
    pub const VOLUME: Field = Field::new("volume", &[]);
    pub const LID_CLOSE: Field = Field::new("lid_close_time_secs", &["closeDoorTimeSec"]);
    pub const DESICCANT_LEFT: Field =
        Field::new("desiccant_remaining_days", &["remainingDesiccantDays"]);
    pub const DESICCANT_CYCLE: Field = Field::new("desiccant_cycle_days", &["desiccantFrequency"]);
    pub const WORK_RECORDS: Field = Field::new("work_records", &[]);

    pub const PLANS: Field = Field::new("plans", &["planList", "list"]);
    pub const PLAN_TIME: Field = Field::new("time", &["executionTime"]);
    pub const PLAN_PORTIONS: Field = Field::new("portions", &["grainNum"]);
    pub const PLAN_DONE: Field = Field::new("completed", &["executed", "isExecuted"]);

    pub const RESOLUTION: Field = Field::new("resolution", &[]);
    pub const NIGHT_VISION: Field = Field::new("night_vision", &["nightVision"]);
    pub const VIDEO_RECORD: Field = Field::new("video_record", &["videoRecordSwitch"]);
    pub const VIDEO_MODE: Field = Field::new("video_record_mode", &["videoRecordMode"]);
}

mod fountain {
    use super::Field;
    pub const WATER_LEVEL: Field = Field::new("water_level", &["waterLevel", "weightPercent"]);
    pub const WATER_WEIGHT: Field = Field::new("water_weight", &["weight"]);
    pub const PUMP_STATE: Field = Field::new("pump_state", &["runningState"]);
    pub const FILTER_LEFT: Field = Field::new("filter_remaining_days", &["remainingReplacementDays"]);
    pub const CLEANING_LEFT: Field = Field::new("cleaning_remaining_days", &["remainingCleaningDays"]);
    pub const TODAY_ML: Field = Field::new("today_water_ml", &["todayTotalMl"]);
    pub const MODE: Field = Field::new("water_mode", &["useWaterType"]);
    pub const INTERVAL: Field = Field::new("water_interval_min", &["useWaterInterval"]);
    pub const DURATION: Field = Field::new("water_duration_min", &["useWaterDuration"]);
    pub const FILTER_CYCLE: Field = Field::new("filter_cycle_days", &["filterReplacementFrequency"]);
    pub const CLEANING_CYCLE: Field = Field::new("cleaning_cycle_days", &["machineCleaningFrequency"]);
}

mod litter {
    use super::Field;
    pub const WASTE_LEVEL: Field = Field::new("waste_level", &["wasteLevel"]);
    pub const LITTER_WEIGHT: Field = Field::new("litter_weight", &["litterWeight"]);
    pub const ODOR: Field = Field::new("odor_level", &["odorLevel"]);
    pub const FILTER_LEFT: Field = Field::new("filter_remaining_days", &["remainingFilterDays"]);
    pub const LITTER_LEFT: Field = Field::new("litter_remaining_days", &["remainingLitterDays"]);
    pub const USED_TODAY: Field = Field::new("times_used_today", &["timesUsedToday"]);
    pub const LAST_USED: Field = Field::new("last_used", &["lastUsedTime"]);
    pub const AUTO_CLEAN: Field = Field::new("auto_clean", &["autoCleaningEnabled"]);
    pub const CLEAN_INTERVAL: Field = Field::new("cleaning_interval_min", &["cleaningInterval"]);
}

mod rfid {
    use super::Field;
    pub const BOUND_PETS: Field = Field::new("bound_pets", &[]);
    pub const VISITS: Field = Field::new("visit_records", &[]);
    pub const PET_ID: Field = Field::new("pet_id", &["petId", "id"]);
    pub const PET_NAME: Field = Field::new("pet_name", &["petName", "name"]);
    pub const TAG: Field = Field::new("tag", &["rfid", "rfidTag"]);
    pub const AT: Field = Field::new("at", &["recordTime", "time"]);
    pub const DURATION: Field = Field::new("duration_secs", &["duration"]);
    pub const AMOUNT: Field = Field::new("amount", &["grainWeight", "drinkVolume"]);
}

// ── Entry point ─────────────────────────────────────────────────────

/// Decode the merged payload of a device of the given class.
pub fn decode(class: DeviceClass, payload: &Value) -> Result<DeviceState, DecodeError> {
    let r = PayloadReader::new(payload)?;

    Ok(match class {
        DeviceClass::Feeder => DeviceState::Feeder(decode_feeder(&r)?),
        DeviceClass::CameraFeeder => DeviceState::CameraFeeder(CameraFeederState {
            feeder: decode_feeder(&r)?,
            camera: decode_camera(&r)?,
            stream_available: false,
        }),
        DeviceClass::RfidFeeder => DeviceState::RfidFeeder(RfidFeederState {
            feeder: decode_feeder(&r)?,
            rfid_tags: decode_tags(&r)?,
            visits: decode_visits(&r)?,
        }),
        DeviceClass::Fountain => DeviceState::Fountain(decode_fountain(&r)?),
        DeviceClass::RfidFountain => DeviceState::RfidFountain(RfidFountainState {
            fountain: decode_fountain(&r)?,
            rfid_tags: decode_tags(&r)?,
            visits: decode_visits(&r)?,
        }),
        DeviceClass::LitterBox => DeviceState::LitterBox(decode_litter_box(&r)?),
        DeviceClass::Unclassified => DeviceState::Unclassified(decode_common(&r)?),
    })
}

// ── Shared blocks ───────────────────────────────────────────────────

fn decode_common(r: &PayloadReader<'_>) -> Result<CommonState, DecodeError> {
    Ok(CommonState {
        online: r.bool(&common::ONLINE)?,
        wifi_ssid: r.string(&common::WIFI_SSID)?,
        wifi_rssi: r.i64(&common::WIFI_RSSI)?,
        battery_percent: r.u32(&common::BATTERY)?,
        firmware_update: decode_firmware(r)?,
    })
}

/// A pending update is signalled either by a nested `upgrade` section with
/// a job id, or by a flat `hasUpgrade` flag.
fn decode_firmware(r: &PayloadReader<'_>) -> Result<Option<FirmwareUpdate>, DecodeError> {
    if let Some(section) = r.object(&common::UPGRADE)? {
        let u = PayloadReader::new(section)?;
        let pending = u.text_or_number(&common::JOB_ITEM)?.is_some()
            || u.bool(&common::HAS_UPGRADE)?.unwrap_or(false);
        if pending {
            return Ok(Some(FirmwareUpdate {
                target_version: u.text_or_number(&common::TARGET_VERSION)?,
                description: u.string(&common::UPGRADE_DESC)?,
                progress: u.u32(&common::PROGRESS)?,
            }));
        }
    }

    if r.bool(&common::HAS_UPGRADE)?.unwrap_or(false) {
        return Ok(Some(FirmwareUpdate {
            target_version: r.text_or_number(&common::TARGET_VERSION)?,
            description: None,
            progress: None,
        }));
    }
    Ok(None)
}

fn entries<'a>(items: Option<&'a Vec<Value>>) -> Result<Vec<PayloadReader<'a>>, DecodeError> {
    items
        .map(|items| items.iter().map(PayloadReader::new).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
}

// ── Feeders ─────────────────────────────────────────────────────────

fn decode_feeder(r: &PayloadReader<'_>) -> Result<FeederState, DecodeError> {
    let food_remaining = require(&feeder::FOOD_REMAINING, r.u32(&feeder::FOOD_REMAINING)?)?;

    let last_feed = match r.timestamp(&feeder::LAST_FEED)? {
        Some(at) => Some(at),
        None => last_dispense(r)?,
    };

    let food_low = match r.bool(&feeder::FOOD_LOW)? {
        Some(low) => Some(low),
        None => r.bool(&feeder::SURPLUS_GRAIN)?.map(|surplus| !surplus),
    };
    let dispenser_blocked = match r.bool(&feeder::BLOCKED)? {
        Some(blocked) => Some(blocked),
        None => r.bool(&feeder::OUTLET_OK)?.map(|ok| !ok),
    };

    Ok(FeederState {
        common: decode_common(r)?,
        food_remaining,
        last_feed,
        feeding_plan_enabled: r.bool(&feeder::PLAN_ENABLED)?,
        feeding_plan_today: decode_plan(r)?,
        today_feeding_quantity: r.u32(&feeder::TODAY_QUANTITY)?,
        today_feeding_times: r.u32(&feeder::TODAY_TIMES)?,
        food_low,
        dispenser_blocked,
        battery_state: r.string(&feeder::BATTERY_STATE)?,
        child_lock: r.bool(&feeder::CHILD_LOCK)?,
        light: r.bool(&common::LIGHT)?,
        sound: r.bool(&common::SOUND)?,
        volume: r.u32(&feeder::VOLUME)?,
        lid_close_time_secs: r.u32(&feeder::LID_CLOSE)?,
        desiccant_remaining_days: r.u32(&feeder::DESICCANT_LEFT)?,
        desiccant_cycle_days: r.u32(&feeder::DESICCANT_CYCLE)?,
    })
}

/// Newest `GRAIN_OUTPUT_SUCCESS` across the per-day work record groups.
fn last_dispense(
    r: &PayloadReader<'_>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, DecodeError> {
    const DAY_RECORDS: Field = Field::new("workRecords", &["records"]);
    const KIND: Field = Field::new("type", &[]);
    const AT: Field = Field::new("recordTime", &[]);

    let mut newest = None;
    for day in entries(r.array(&feeder::WORK_RECORDS)?)? {
        for record in entries(day.array(&DAY_RECORDS)?)? {
            if record.string(&KIND)?.as_deref() != Some("GRAIN_OUTPUT_SUCCESS") {
                continue;
            }
            if let Some(at) = record.timestamp(&AT)? {
                newest = newest.max(Some(at));
            }
        }
    }
    Ok(newest)
}

/// Today's plan arrives either as a bare list or wrapped in an object.
fn decode_plan(r: &PayloadReader<'_>) -> Result<Option<Vec<PlannedMeal>>, DecodeError> {
    let items = match r.get(&feeder::PLAN_TODAY) {
        None => return Ok(None),
        Some((_, Value::Array(items))) => Some(items),
        Some((_, wrapper @ Value::Object(_))) => PayloadReader::new(wrapper)?.array(&feeder::PLANS)?,
        Some((key, _)) => {
            return Err(DecodeError::UnknownShape {
                field: key.to_owned(),
                expected: "array or object",
            });
        }
    };

    entries(items)?
        .iter()
        .map(|meal| -> Result<PlannedMeal, DecodeError> {
            Ok(PlannedMeal {
                time: meal.text_or_number(&feeder::PLAN_TIME)?,
                portions: meal.u32(&feeder::PLAN_PORTIONS)?,
                completed: meal.bool(&feeder::PLAN_DONE)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn decode_camera(r: &PayloadReader<'_>) -> Result<CameraState, DecodeError> {
    Ok(CameraState {
        resolution: r.text_or_number(&feeder::RESOLUTION)?,
        night_vision: r.text_or_number(&feeder::NIGHT_VISION)?,
        video_record: r.bool(&feeder::VIDEO_RECORD)?,
        video_record_mode: r.text_or_number(&feeder::VIDEO_MODE)?,
    })
}

// ── Fountains ───────────────────────────────────────────────────────

fn decode_fountain(r: &PayloadReader<'_>) -> Result<FountainState, DecodeError> {
    let water_level = require(&fountain::WATER_LEVEL, r.u32(&fountain::WATER_LEVEL)?)?;

    Ok(FountainState {
        common: decode_common(r)?,
        water_level,
        water_weight: r.f64(&fountain::WATER_WEIGHT)?,
        pump_state: r.string(&fountain::PUMP_STATE)?,
        filter_remaining_days: r.u32(&fountain::FILTER_LEFT)?,
        cleaning_remaining_days: r.u32(&fountain::CLEANING_LEFT)?,
        today_water_ml: r.u32(&fountain::TODAY_ML)?,
        water_mode: decode_water_mode(r)?,
        water_interval_min: r.u32(&fountain::INTERVAL)?,
        water_duration_min: r.u32(&fountain::DURATION)?,
        filter_cycle_days: r.u32(&fountain::FILTER_CYCLE)?,
        cleaning_cycle_days: r.u32(&fountain::CLEANING_CYCLE)?,
        light: r.bool(&common::LIGHT)?,
        sound: r.bool(&common::SOUND)?,
    })
}

/// Wire code (`0`/`1`) or the snake_case name. Unknown codes read as unknown.
fn decode_water_mode(r: &PayloadReader<'_>) -> Result<Option<WaterMode>, DecodeError> {
    match r.get(&fountain::MODE) {
        None => Ok(None),
        Some((_, Value::Number(n))) => Ok(n.as_i64().and_then(WaterMode::from_wire)),
        Some((_, Value::String(s))) => Ok(s.parse().ok()),
        Some((key, _)) => Err(DecodeError::UnknownShape {
            field: key.to_owned(),
            expected: "water mode code",
        }),
    }
}

// ── Litter boxes ────────────────────────────────────────────────────

fn decode_litter_box(r: &PayloadReader<'_>) -> Result<LitterBoxState, DecodeError> {
    let waste_level = require(&litter::WASTE_LEVEL, r.u32(&litter::WASTE_LEVEL)?)?;

    Ok(LitterBoxState {
        common: decode_common(r)?,
        waste_level,
        litter_weight: r.f64(&litter::LITTER_WEIGHT)?,
        odor_level: r.u32(&litter::ODOR)?,
        filter_remaining_days: r.u32(&litter::FILTER_LEFT)?,
        litter_remaining_days: r.u32(&litter::LITTER_LEFT)?,
        times_used_today: r.u32(&litter::USED_TODAY)?,
        last_used: r.timestamp(&litter::LAST_USED)?,
        auto_clean: r.bool(&litter::AUTO_CLEAN)?,
        cleaning_interval_min: r.u32(&litter::CLEAN_INTERVAL)?,
    })
}

// ── RFID ────────────────────────────────────────────────────────────

fn decode_tags(r: &PayloadReader<'_>) -> Result<Vec<RfidTag>, DecodeError> {
    entries(r.array(&rfid::BOUND_PETS)?)?
        .iter()
        .map(|pet| -> Result<RfidTag, DecodeError> {
            Ok(RfidTag {
                pet_id: pet.text_or_number(&rfid::PET_ID)?,
                pet_name: pet.string(&rfid::PET_NAME)?,
                tag: pet.text_or_number(&rfid::TAG)?,
            })
        })
        .collect()
}

/// Visits newest first. Records without a timestamp are dropped.
fn decode_visits(r: &PayloadReader<'_>) -> Result<Vec<PetVisit>, DecodeError> {
    let mut visits = Vec::new();
    for visit in entries(r.array(&rfid::VISITS)?)? {
        let Some(at) = visit.timestamp(&rfid::AT)? else {
            continue;
        };
        visits.push(PetVisit {
            pet_id: visit.text_or_number(&rfid::PET_ID)?,
            pet_name: visit.string(&rfid::PET_NAME)?,
            at,
            duration_secs: visit.u32(&rfid::DURATION)?,
            amount: visit.f64(&rfid::AMOUNT)?,
        });
    }
    visits.sort_by(|a, b| b.at.cmp(&a.at));
    Ok(visits)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn feeder_state(payload: &Value) -> FeederState {
        match decode(DeviceClass::Feeder, payload).unwrap() {
            DeviceState::Feeder(state) => state,
            other => panic!("expected feeder state, got {other:?}"),
        }
    }

    #[test]
    fn feeder_minimal_payload() {
        let state = feeder_state(&json!({
            "food_remaining": 42,
            "last_feed": "2024-01-01T00:00:00Z"
        }));
        assert_eq!(state.food_remaining, 42);
        assert_eq!(
            state.last_feed,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(state.child_lock, None);
        assert_eq!(state.common, CommonState::default());
    }

    #[test]
    fn feeder_without_food_remaining_is_missing_field() {
        let err = decode(DeviceClass::Feeder, &json!({ "last_feed": "2024-01-01T00:00:00Z" }))
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingField {
                field: "food_remaining"
            }
        );
    }

    #[test]
    fn decoding_is_deterministic() {
        let payload = json!({
            "foodRemaining": 7,
            "surplusGrain": false,
            "grainOutletState": true,
            "childLockSwitch": 1,
            "work_records": [
                { "workRecords": [
                    { "type": "GRAIN_OUTPUT_SUCCESS", "recordTime": 1_704_067_200_000_i64 },
                    { "type": "GRAIN_OUTPUT_SUCCESS", "recordTime": 1_704_070_800_000_i64 }
                ]}
            ]
        });
        let first = decode(DeviceClass::RfidFeeder, &payload).unwrap();
        let second = decode(DeviceClass::RfidFeeder, &payload).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn vendor_spellings_and_inverted_flags() {
        let state = feeder_state(&json!({
            "remainingFood": 60,
            "surplusGrain": false,
            "grainOutletState": true,
            "childLockSwitch": true,
            "closeDoorTimeSec": 5,
            "wifiRssi": -61,
            "electricQuantity": 80,
            "enableFeedingPlan": true
        }));
        assert_eq!(state.food_remaining, 60);
        assert_eq!(state.food_low, Some(true));
        assert_eq!(state.dispenser_blocked, Some(false));
        assert_eq!(state.child_lock, Some(true));
        assert_eq!(state.lid_close_time_secs, Some(5));
        assert_eq!(state.common.wifi_rssi, Some(-61));
        assert_eq!(state.common.battery_percent, Some(80));
        assert_eq!(state.feeding_plan_enabled, Some(true));
    }

    #[test]
    fn last_feed_falls_back_to_newest_dispense_record() {
        let state = feeder_state(&json!({
            "food_remaining": 10,
            "work_records": [
                { "workRecords": [
                    { "type": "GRAIN_OUTPUT_SUCCESS", "recordTime": 1_704_067_200_000_i64 },
                    { "type": "DEVICE_ONLINE", "recordTime": 1_704_200_000_000_i64 }
                ]},
                { "workRecords": [
                    { "type": "GRAIN_OUTPUT_SUCCESS", "recordTime": 1_704_070_800_000_i64 }
                ]}
            ]
        }));
        assert_eq!(
            state.last_feed,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn feeding_plan_accepts_wrapped_and_bare_lists() {
        let bare = feeder_state(&json!({
            "food_remaining": 1,
            "feeding_plan_today": [{ "executionTime": "08:00", "grainNum": 2, "executed": true }]
        }));
        let wrapped = feeder_state(&json!({
            "food_remaining": 1,
            "feeding_plan_today": { "plans": [{ "executionTime": "08:00", "grainNum": 2, "executed": 1 }] }
        }));
        let expected = vec![PlannedMeal {
            time: Some("08:00".into()),
            portions: Some(2),
            completed: Some(true),
        }];
        assert_eq!(bare.feeding_plan_today, Some(expected.clone()));
        assert_eq!(wrapped.feeding_plan_today, Some(expected));
    }

    #[test]
    fn wrong_type_is_unknown_shape() {
        let err = decode(DeviceClass::Feeder, &json!({ "food_remaining": "lots" })).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownShape { .. }));

        let err = decode(DeviceClass::Fountain, &json!("not an object")).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownShape { .. }));
    }

    #[test]
    fn camera_feeder_never_reports_a_stream() {
        let state = decode(
            DeviceClass::CameraFeeder,
            &json!({ "food_remaining": 50, "resolution": "1080P", "videoRecordSwitch": true }),
        )
        .unwrap();
        let DeviceState::CameraFeeder(camera) = state else {
            panic!("expected camera feeder");
        };
        assert!(!camera.stream_available);
        assert_eq!(camera.camera.resolution.as_deref(), Some("1080P"));
        assert_eq!(camera.camera.video_record, Some(true));
    }

    #[test]
    fn fountain_reads_dispensing_settings() {
        let state = decode(
            DeviceClass::Fountain,
            &json!({
                "weightPercent": 73,
                "weight": 812.5,
                "runningState": "RUNNING",
                "useWaterType": 1,
                "useWaterInterval": 30,
                "useWaterDuration": 5,
                "todayTotalMl": 240,
                "upgrade": { "jobItemId": "job-9", "targetVersion": "2.1.0", "progress": 0 }
            }),
        )
        .unwrap();
        let fountain = state.fountain().unwrap();
        assert_eq!(fountain.water_level, 73);
        assert_eq!(fountain.water_mode, Some(WaterMode::Intermittent));
        assert_eq!(fountain.water_interval_min, Some(30));
        assert_eq!(fountain.water_duration_min, Some(5));
        assert_eq!(fountain.today_water_ml, Some(240));
        assert_eq!(
            state.common().firmware_update,
            Some(FirmwareUpdate {
                target_version: Some("2.1.0".into()),
                description: None,
                progress: Some(0),
            })
        );
    }

    #[test]
    fn fountain_requires_water_level() {
        let err = decode(DeviceClass::RfidFountain, &json!({ "weight": 10.0 })).unwrap_err();
        assert_eq!(err, DecodeError::MissingField { field: "water_level" });
    }

    #[test]
    fn rfid_visits_are_sorted_newest_first() {
        let state = decode(
            DeviceClass::RfidFountain,
            &json!({
                "waterLevel": 40,
                "bound_pets": [{ "petId": 11, "petName": "Miso", "rfid": "A1B2" }],
                "visit_records": [
                    { "petId": 11, "recordTime": 1_704_067_200_000_i64, "duration": 20 },
                    { "petId": 11, "recordTime": 1_704_153_600_000_i64, "drinkVolume": 12.5 },
                    { "petId": 11 }
                ]
            }),
        )
        .unwrap();
        let DeviceState::RfidFountain(s) = state else {
            panic!("expected rfid fountain");
        };
        assert_eq!(s.rfid_tags.len(), 1);
        assert_eq!(s.rfid_tags[0].tag.as_deref(), Some("A1B2"));
        assert_eq!(s.visits.len(), 2);
        assert!(s.visits[0].at > s.visits[1].at);
        assert_eq!(s.visits[0].amount, Some(12.5));
    }

    #[test]
    fn litter_box_requires_waste_level() {
        let state = decode(
            DeviceClass::LitterBox,
            &json!({ "wasteLevel": 35, "timesUsedToday": 4, "hasUpgrade": true, "latestVersion": "1.0.9" }),
        )
        .unwrap();
        let DeviceState::LitterBox(litter) = &state else {
            panic!("expected litter box");
        };
        assert_eq!(litter.waste_level, 35);
        assert_eq!(litter.times_used_today, Some(4));
        assert_eq!(
            state.common().firmware_update.as_ref().and_then(|u| u.target_version.as_deref()),
            Some("1.0.9")
        );

        assert!(decode(DeviceClass::LitterBox, &json!({})).is_err());
    }

    #[test]
    fn unclassified_keeps_common_attributes_only() {
        let state = decode(
            DeviceClass::Unclassified,
            &json!({ "online": true, "wifiSsid": "home", "anything": [1, 2, 3] }),
        )
        .unwrap();
        assert_eq!(state.class(), DeviceClass::Unclassified);
        assert_eq!(state.common().online, Some(true));
        assert_eq!(state.common().wifi_ssid.as_deref(), Some("home"));
    }
}
