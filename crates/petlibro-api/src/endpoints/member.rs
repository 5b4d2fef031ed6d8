// Member (account) endpoints

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::CloudClient;
use crate::error::TransportError;

impl CloudClient {
    /// Profile and unit preferences of the logged-in account.
    ///
    /// `POST /member/member/info`
    pub async fn member_info(&self) -> Result<Value, TransportError> {
        debug!("fetching member info");
        self.post("/member/member/info", &json!({})).await
    }

    /// Update profile fields (`nickname`, `gender`).
    ///
    /// `POST /member/member/update`
    pub async fn member_update_info(&self, fields: Map<String, Value>) -> Result<(), TransportError> {
        debug!(fields = fields.len(), "updating member info");
        let _: Value = self.post("/member/member/update", &Value::Object(fields)).await?;
        Ok(())
    }

    /// Update unit settings (`feedUnitType`, `waterUnitType`, `weightUnitType`).
    ///
    /// `POST /member/setting/update`
    pub async fn member_update_setting(
        &self,
        fields: Map<String, Value>,
    ) -> Result<(), TransportError> {
        debug!(fields = fields.len(), "updating member settings");
        let _: Value = self.post("/member/setting/update", &Value::Object(fields)).await?;
        Ok(())
    }
}
