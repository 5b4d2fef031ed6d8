// Wire-level types for the PETLIBRO cloud API.
//
// Every response is wrapped in `{ code, msg, data }`. Device payloads are
// kept as loose JSON maps; typed decoding happens in petlibro-core.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope code for a successful call.
pub const CODE_OK: i64 = 0;

/// Envelope code the cloud returns when the token is missing or revoked.
pub const CODE_NOT_LOGGED_IN: i64 = 1009;

/// The `{ code, msg, data }` wrapper around every response body.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub(crate) fn message(&self) -> String {
        self.msg
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("code={}", self.code))
    }
}

/// `data` of a successful login.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    pub token: String,
}

/// One entry of `/device/device/list`.
///
/// Only the identity fields are typed; everything else the listing carries
/// (Wi-Fi, firmware, battery hints) stays in `extra` for the decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    pub device_sn: String,
    #[serde(default)]
    pub product_identifier: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Consumable counters that share the maintenance endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceKey {
    /// Feeder desiccant pack.
    Desiccant,
    /// Fountain filter cartridge.
    FilterElement,
    /// Fountain deep-clean reminder.
    MachineCleaning,
}
