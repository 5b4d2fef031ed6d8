// ── Device domain type ──
//
// Identity and listing metadata of one appliance. Live readings live in
// `DeviceState`; this type only changes when the listing does.

use petlibro_api::RawDevice;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ids::{DeviceSerial, MacAddress};

/// Closed set of appliance families the bridge knows how to decode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeviceClass {
    Feeder,
    CameraFeeder,
    RfidFeeder,
    Fountain,
    RfidFountain,
    LitterBox,
    /// Listed by the cloud but not a known SKU. Visible, never controllable.
    Unclassified,
}

/// SKU → class table.
const SKU_TABLE: &[(&str, DeviceClass)] = &[
    ("PLAF103", DeviceClass::Feeder),
    ("PLAF107", DeviceClass::Feeder),
    ("PLAF108", DeviceClass::Feeder),
    ("PLAF109", DeviceClass::Feeder),
    ("PLAF006", DeviceClass::Feeder),
    ("PLAF203", DeviceClass::CameraFeeder),
    ("PLAF301", DeviceClass::RfidFeeder),
    ("PLWF105", DeviceClass::Fountain),
    ("PLWF106", DeviceClass::Fountain),
    ("PLWF116", DeviceClass::Fountain),
    ("PLWF305", DeviceClass::RfidFountain),
    ("PLLB001", DeviceClass::LitterBox),
];

impl DeviceClass {
    /// Classify a product identifier. Matching is case-insensitive on the
    /// trimmed value; anything not in the table is [`Unclassified`](Self::Unclassified).
    pub fn from_product_identifier(sku: &str) -> Self {
        let sku = sku.trim();
        SKU_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(sku))
            .map_or(Self::Unclassified, |(_, class)| *class)
    }

    pub fn is_feeder(self) -> bool {
        matches!(self, Self::Feeder | Self::CameraFeeder | Self::RfidFeeder)
    }

    pub fn is_fountain(self) -> bool {
        matches!(self, Self::Fountain | Self::RfidFountain)
    }

    pub fn has_rfid(self) -> bool {
        matches!(self, Self::RfidFeeder | Self::RfidFountain)
    }
}

/// A device bound to the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub serial: DeviceSerial,
    pub class: DeviceClass,
    pub product_identifier: Option<String>,
    pub product_name: Option<String>,
    /// User-assigned name, falling back to the product name, then the serial.
    pub name: String,
    pub mac: Option<MacAddress>,
    pub firmware_version: Option<String>,
    pub online: bool,
}

impl Device {
    /// Build a device from one listing entry.
    pub fn from_raw(raw: &RawDevice) -> Self {
        let serial = DeviceSerial::new(&raw.device_sn);
        let class = raw
            .product_identifier
            .as_deref()
            .map_or(DeviceClass::Unclassified, DeviceClass::from_product_identifier);
        let name = non_empty(raw.name.as_deref())
            .or_else(|| non_empty(raw.product_name.as_deref()))
            .map_or_else(|| serial.to_string(), str::to_owned);

        Self {
            serial,
            class,
            product_identifier: raw.product_identifier.clone(),
            product_name: raw.product_name.clone(),
            name,
            mac: non_empty(raw.mac.as_deref()).map(MacAddress::new),
            firmware_version: raw.software_version.clone(),
            online: raw.online,
        }
    }

    /// Whether `other` is the same physical device (same serial and class).
    pub fn same_identity(&self, other: &Self) -> bool {
        self.serial == other.serial && self.class == other.class
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
