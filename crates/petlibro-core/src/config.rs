// ── Runtime bridge configuration ──
//
// Describes *how* to reach the PETLIBRO cloud and how often to poll.
// Carries credentials but never touches disk; petlibro-config (or any
// other host) builds a `BridgeConfig` and hands it in.

use std::time::Duration;

use petlibro_api::{Credentials, DEFAULT_SESSION_TTL, Region, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::coordinator::DEFAULT_POLL_INTERVAL;
use crate::error::CoreError;

/// Configuration for one account.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub email: String,
    pub password: SecretString,
    pub region: Region,
    /// Overrides the region's API host (proxies, tests).
    pub base_url: Option<Url>,
    /// Time between polling cycles. Zero disables scheduled polling.
    pub poll_interval: Duration,
    /// Re-run discovery every N cycles. 0 = only at setup.
    pub rediscover_every: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Assumed token validity; the cloud does not report an expiry.
    pub session_ttl: Duration,
    /// IANA zone sent with requests and at login.
    pub time_zone: String,
    pub language: String,
}

impl BridgeConfig {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        let transport = TransportConfig::default();
        Self {
            email: email.into(),
            password,
            region: Region::Us,
            base_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rediscover_every: 0,
            timeout: transport.timeout,
            session_ttl: DEFAULT_SESSION_TTL,
            time_zone: transport.time_zone,
            language: transport.language,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            time_zone: self.time_zone.clone(),
            language: self.language.clone(),
            ..TransportConfig::default()
        }
    }

    /// The override if set, otherwise the region's API host.
    pub fn resolved_base_url(&self) -> Result<Url, CoreError> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => self.region.base_url().map_err(|e| CoreError::Config {
                message: format!("invalid API host for region {}: {e}", self.region),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_us_cloud() {
        let config = BridgeConfig::new("owner@example.com", SecretString::from("pw".to_owned()));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
        assert_eq!(
            config.resolved_base_url().unwrap().as_str(),
            "https://api.us.petlibro.com/"
        );
    }

    #[test]
    fn base_url_override_wins() {
        let mut config =
            BridgeConfig::new("owner@example.com", SecretString::from("pw".to_owned()));
        config.base_url = Some("http://127.0.0.1:8080/proxy".parse().unwrap());
        assert_eq!(
            config.resolved_base_url().unwrap().as_str(),
            "http://127.0.0.1:8080/proxy"
        );
        assert_eq!(config.transport().language, "EN");
    }
}
