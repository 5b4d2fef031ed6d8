// Shared transport configuration for building reqwest::Client instances.
//
// AuthSession and CloudClient both send the vendor's fixed app headers
// (`source`, `language`, `timezone`, `version`); they are baked into the
// client as default headers here so neither caller repeats them.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::TransportError;

/// App version the cloud expects in the `version` header.
pub const APP_VERSION: &str = "1.3.45";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// IANA time zone name sent with every request and at login.
    pub time_zone: String,
    /// Two-letter UI language code (`EN`, `DE`, ...).
    pub language: String,
    pub app_version: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            time_zone: "America/New_York".into(),
            language: "EN".into(),
            app_version: APP_VERSION.into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("petlibro-bridge/", env!("CARGO_PKG_VERSION")))
            .default_headers(self.default_headers())
            .build()
            .map_err(TransportError::Client)
    }

    /// The fixed app headers. Values that are not valid header text are
    /// skipped rather than failing client construction.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("source"),
            HeaderValue::from_static("ANDROID"),
        );
        for (name, value) in [
            (HeaderName::from_static("language"), self.language.as_str()),
            (HeaderName::from_static("timezone"), self.time_zone.as_str()),
            (HeaderName::from_static("version"), self.app_version.as_str()),
        ] {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
        headers
    }
}

/// Append an absolute API path to the base URL, keeping any path prefix
/// the base already carries (for proxies and test servers).
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
    url
}
