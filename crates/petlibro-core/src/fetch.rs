// ── Raw payload assembly ──
//
// Each device class reads a fixed set of cloud sections. They are fetched
// concurrently and merged into the single JSON object `decode` consumes.

use futures_util::future::join_all;
use petlibro_api::{CloudClient, TransportError};
use serde_json::{Map, Value};
use strum::{Display, IntoStaticStr};
use tracing::{debug, warn};

use crate::model::{Device, DeviceClass};

/// One cloud read that contributes to a device payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Section {
    RealInfo,
    GrainStatus,
    AttributeSettings,
    DataRealInfo,
    Upgrade,
    FeedingPlanToday,
    WorkRecords,
    VisitRecords,
    BoundPets,
}

impl Section {
    /// Flat sections are merged key-wise into the payload root; the rest
    /// are stored under their own name.
    fn is_flat(self) -> bool {
        matches!(
            self,
            Self::RealInfo | Self::GrainStatus | Self::AttributeSettings | Self::DataRealInfo
        )
    }

    /// Without the primary section there is nothing to decode.
    fn is_primary(self) -> bool {
        self == Self::RealInfo
    }

    async fn fetch(self, client: &CloudClient, serial: &str) -> Result<Value, TransportError> {
        match self {
            Self::RealInfo => client.device_real_info(serial).await,
            Self::GrainStatus => client.device_grain_status(serial).await,
            Self::AttributeSettings => client.device_attribute_settings(serial).await,
            Self::DataRealInfo => client.device_data_real_info(serial).await,
            Self::Upgrade => client.device_upgrade(serial).await,
            Self::FeedingPlanToday => client.device_feeding_plan_today(serial).await,
            Self::WorkRecords => client.device_work_records(serial).await,
            Self::VisitRecords => client.device_visit_records(serial).await,
            Self::BoundPets => client.device_bound_pets(serial).await,
        }
    }
}

const FEEDER: &[Section] = &[
    Section::RealInfo,
    Section::GrainStatus,
    Section::AttributeSettings,
    Section::Upgrade,
    Section::FeedingPlanToday,
    Section::WorkRecords,
];

const RFID_FEEDER: &[Section] = &[
    Section::RealInfo,
    Section::GrainStatus,
    Section::AttributeSettings,
    Section::Upgrade,
    Section::FeedingPlanToday,
    Section::WorkRecords,
    Section::BoundPets,
    Section::VisitRecords,
];

const FOUNTAIN: &[Section] = &[Section::RealInfo, Section::Upgrade];

const RFID_FOUNTAIN: &[Section] = &[
    Section::RealInfo,
    Section::Upgrade,
    Section::BoundPets,
    Section::VisitRecords,
];

const LITTER_BOX: &[Section] = &[
    Section::RealInfo,
    Section::DataRealInfo,
    Section::AttributeSettings,
    Section::Upgrade,
];

const UNCLASSIFIED: &[Section] = &[Section::RealInfo];

/// Sections read for a class, primary first.
pub(crate) fn sections_for(class: DeviceClass) -> &'static [Section] {
    match class {
        DeviceClass::Feeder | DeviceClass::CameraFeeder => FEEDER,
        DeviceClass::RfidFeeder => RFID_FEEDER,
        DeviceClass::Fountain => FOUNTAIN,
        DeviceClass::RfidFountain => RFID_FOUNTAIN,
        DeviceClass::LitterBox => LITTER_BOX,
        DeviceClass::Unclassified => UNCLASSIFIED,
    }
}

/// Fetch and merge every section for `device`.
///
/// Fails only when the primary section fails; optional sections that
/// error are logged and left out.
pub(crate) async fn fetch_payload(
    client: &CloudClient,
    device: &Device,
) -> Result<Value, TransportError> {
    let serial = device.serial.as_str();
    let sections = sections_for(device.class);

    let results = join_all(sections.iter().map(|s| s.fetch(client, serial))).await;

    let mut parts = Vec::with_capacity(sections.len());
    for (section, result) in sections.iter().copied().zip(results) {
        match result {
            Ok(data) => parts.push((section, data)),
            Err(e) if section.is_primary() => return Err(e),
            Err(e) => warn!(serial, %section, error = %e, "optional section failed, skipping"),
        }
    }

    let payload = assemble(parts, device.online);
    debug!(serial, keys = payload.len(), "payload assembled");
    Ok(Value::Object(payload))
}

/// Merge fetched sections in order. Flat sections keep the first value
/// seen for a key; the listing's online flag only fills a gap.
pub(crate) fn assemble(parts: Vec<(Section, Value)>, online: bool) -> Map<String, Value> {
    let mut payload = Map::new();

    for (section, data) in parts {
        if section.is_flat() {
            match data {
                Value::Object(fields) => {
                    for (key, value) in fields {
                        payload.entry(key).or_insert(value);
                    }
                }
                Value::Null => {}
                other => {
                    let name: &'static str = section.into();
                    warn!(section = name, kind = json_kind(&other), "section is not an object, ignoring");
                }
            }
        } else if !data.is_null() {
            payload.insert(section.to_string(), data);
        }
    }

    payload
        .entry("online")
        .and_modify(|v| {
            if v.is_null() {
                *v = Value::Bool(online);
            }
        })
        .or_insert(Value::Bool(online));
    payload
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
