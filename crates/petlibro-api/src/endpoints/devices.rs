// Device endpoints
//
// Listing plus the per-device read sections the poller merges into one
// raw payload. Section bodies are returned as loose JSON because the field
// set varies by model and firmware.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::CloudClient;
use crate::error::TransportError;
use crate::models::RawDevice;

/// Work records and visit logs are requested for this trailing window.
const HISTORY_WINDOW_DAYS: i64 = 7;

/// Upper bound on history entries per request.
const HISTORY_PAGE_SIZE: u32 = 25;

impl CloudClient {
    /// List every device bound to the account.
    ///
    /// `POST /device/device/list`
    pub async fn list_devices(&self) -> Result<Vec<RawDevice>, TransportError> {
        debug!("listing devices");
        let data: Option<Vec<RawDevice>> = self.post("/device/device/list", &json!({})).await?;
        Ok(data.unwrap_or_default())
    }

    /// Live status block (levels, switches, Wi-Fi, battery).
    ///
    /// `POST /device/device/realInfo`
    pub async fn device_real_info(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching real info");
        self.post("/device/device/realInfo", &json!({ "id": serial, "deviceSn": serial }))
            .await
    }

    /// Feeder daily totals (`todayFeedingQuantity`, `todayFeedingTimes`).
    ///
    /// `POST /device/data/grainStatus`
    pub async fn device_grain_status(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching grain status");
        self.post("/device/data/grainStatus", &json!({ "id": serial }))
            .await
    }

    /// Persisted device settings (volume, lid, light schedule).
    ///
    /// `POST /device/setting/getAttributeSetting`
    pub async fn device_attribute_settings(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching attribute settings");
        self.post("/device/setting/getAttributeSetting", &json!({ "id": serial }))
            .await
    }

    /// Pending firmware upgrade, `null` when up to date.
    ///
    /// `POST /device/ota/getUpgrade`
    pub async fn device_upgrade(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching firmware upgrade info");
        self.post("/device/ota/getUpgrade", &json!({ "id": serial }))
            .await
    }

    /// Today's scheduled meals.
    ///
    /// `POST /device/feedingPlan/todayNew`
    pub async fn device_feeding_plan_today(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching today's feeding plan");
        self.post("/device/feedingPlan/todayNew", &json!({ "id": serial }))
            .await
    }

    /// Recent work records (dispense events, errors), newest first.
    ///
    /// `POST /device/workRecord/list`
    pub async fn device_work_records(&self, serial: &str) -> Result<Value, TransportError> {
        let (start, end) = history_window();
        debug!(serial, "fetching work records");
        self.post(
            "/device/workRecord/list",
            &json!({
                "deviceSn": serial,
                "startTime": start,
                "endTime": end,
                "size": HISTORY_PAGE_SIZE,
            }),
        )
        .await
    }

    /// Per-pet RFID visit log (eating or drinking sessions).
    ///
    /// `POST /device/data/petVisitRecords`
    pub async fn device_visit_records(&self, serial: &str) -> Result<Value, TransportError> {
        let (start, end) = history_window();
        debug!(serial, "fetching visit records");
        self.post(
            "/device/data/petVisitRecords",
            &json!({
                "deviceSn": serial,
                "startTime": start,
                "endTime": end,
                "size": HISTORY_PAGE_SIZE,
            }),
        )
        .await
    }

    /// Pets bound to an RFID device, each with its tag id.
    ///
    /// `POST /device/devicePetRelation/getBoundPets`
    pub async fn device_bound_pets(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching bound pets");
        self.post(
            "/device/devicePetRelation/getBoundPets",
            &json!({ "deviceSn": serial }),
        )
        .await
    }

    /// Litter box statistics (waste level, usage counters).
    ///
    /// `POST /device/data/dataRealInfo`
    pub async fn device_data_real_info(&self, serial: &str) -> Result<Value, TransportError> {
        debug!(serial, "fetching data real info");
        self.post("/device/data/dataRealInfo", &json!({ "id": serial }))
            .await
    }
}

/// `(start, end)` in epoch milliseconds.
fn history_window() -> (i64, i64) {
    let end = Utc::now();
    let start = end - chrono::Duration::days(HISTORY_WINDOW_DAYS);
    (start.timestamp_millis(), end.timestamp_millis())
}
