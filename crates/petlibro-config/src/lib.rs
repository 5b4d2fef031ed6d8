//! Shared configuration for PETLIBRO tools.
//!
//! TOML profiles, credential resolution (env + plaintext), and translation
//! to `petlibro_core::BridgeConfig`. Core never reads files itself; the CLI
//! (or any other host) loads a [`Config`] here and hands the resulting
//! `BridgeConfig` in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use petlibro_api::Region;
use petlibro_core::BridgeConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted for the password when a profile names none.
pub const PASSWORD_ENV: &str = "PETLIBRO_PASSWORD";
/// Environment variable consulted for the email when a profile has none.
pub const EMAIL_ENV: &str = "PETLIBRO_EMAIL";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is requested explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    /// `requested`, else `default_profile`, else `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Seconds between polling cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_poll_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    30
}

/// One PETLIBRO account.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Login email.
    pub email: Option<String>,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    #[serde(default)]
    pub region: Region,

    /// Override the regional API host.
    pub base_url: Option<String>,

    /// Override `defaults.poll_interval` (seconds, 0 disables polling).
    pub poll_interval: Option<u64>,

    /// Re-run device discovery every N cycles.
    pub rediscover_every: Option<u32>,

    /// Override `defaults.timeout` (seconds).
    pub timeout: Option<u64>,

    /// Assumed token lifetime in seconds.
    pub session_ttl: Option<u64>,

    /// IANA time zone, e.g. "Europe/Berlin".
    pub time_zone: Option<String>,

    pub language: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "petlibro", "petlibro").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("petlibro");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered provider: defaults, then the TOML file at `path`, then
/// `PETLIBRO_*` variables (`__` separates nested keys, e.g.
/// `PETLIBRO_DEFAULTS__POLL_INTERVAL`).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PETLIBRO_").split("__"))
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(figment_for(path).extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve email and password from the process environment and profile.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    resolve_credentials_with(profile, profile_name, |name| std::env::var(name).ok())
}

/// Like [`resolve_credentials`], with an injectable variable lookup.
///
/// Email: profile, then `PETLIBRO_EMAIL`.
pub fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let email = profile
        .email
        .clone()
        .or_else(|| lookup(EMAIL_ENV))
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let password = resolve_password_with(profile, profile_name, lookup)?;
    Ok((email, password))
}

/// Password alone: the variable named by `password_env`, then
/// `PETLIBRO_PASSWORD`, then plaintext in the profile.
pub fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    profile
        .password_env
        .as_deref()
        .and_then(&lookup)
        .or_else(|| lookup(PASSWORD_ENV))
        .or_else(|| profile.password.clone())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(profile, profile_name, |name| std::env::var(name).ok())
}

// ── Translation to core ─────────────────────────────────────────────

/// Build a `BridgeConfig` from a profile and the global defaults.
pub fn profile_to_bridge_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<BridgeConfig, ConfigError> {
    let (email, password) = resolve_credentials(profile, profile_name)?;
    build_bridge_config(profile, defaults, email, password)
}

/// The translation step alone, for hosts that resolve credentials
/// themselves (prompt, flags).
pub fn build_bridge_config(
    profile: &Profile,
    defaults: &Defaults,
    email: String,
    password: SecretString,
) -> Result<BridgeConfig, ConfigError> {
    let mut config = BridgeConfig::new(email, password);
    config.region = profile.region;

    if let Some(raw) = &profile.base_url {
        let url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
        config.base_url = Some(url);
    }

    config.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if config.timeout.is_zero() {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    if let Some(every) = profile.rediscover_every {
        config.rediscover_every = every;
    }
    if let Some(ttl) = profile.session_ttl {
        config.session_ttl = Duration::from_secs(ttl);
    }
    if let Some(tz) = &profile.time_zone {
        if tz.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "time_zone".into(),
                reason: "must not be empty".into(),
            });
        }
        config.time_zone.clone_from(tz);
    }
    if let Some(language) = &profile.language {
        config.language = language.to_uppercase();
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile() -> Profile {
        Profile {
            email: Some("owner@example.com".into()),
            password: Some("from-file".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn password_env_beats_plaintext() {
        let mut p = profile();
        p.password_env = Some("MY_PW".into());
        let (_, pw) = resolve_credentials_with(&p, "home", |name| {
            (name == "MY_PW").then(|| "from-env".to_owned())
        })
        .unwrap();
        assert_eq!(pw.expose_secret(), "from-env");
    }

    #[test]
    fn falls_back_to_plaintext_password() {
        let (email, pw) = resolve_credentials_with(&profile(), "home", |_| None).unwrap();
        assert_eq!(email, "owner@example.com");
        assert_eq!(pw.expose_secret(), "from-file");
    }

    #[test]
    fn missing_email_is_no_credentials() {
        let p = Profile {
            password: Some("pw".into()),
            ..Profile::default()
        };
        let err = resolve_credentials_with(&p, "home", |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "home"));
    }

    #[test]
    fn profile_overrides_defaults() {
        let mut p = profile();
        p.poll_interval = Some(15);
        p.time_zone = Some("Europe/Berlin".into());
        p.language = Some("de".into());
        let config = build_bridge_config(
            &p,
            &Defaults::default(),
            "owner@example.com".into(),
            SecretString::from("pw"),
        )
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.time_zone, "Europe/Berlin");
        assert_eq!(config.language, "DE");
        assert_eq!(config.region, Region::Us);
    }

    #[test]
    fn bad_base_url_is_a_validation_error() {
        let mut p = profile();
        p.base_url = Some("not a url".into());
        let err = build_bridge_config(
            &p,
            &Defaults::default(),
            "owner@example.com".into(),
            SecretString::from("pw"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "base_url"));
    }

    #[test]
    fn active_profile_prefers_the_request() {
        let config = Config::default();
        assert_eq!(config.active_profile_name(Some("cabin")), "cabin");
        assert_eq!(config.active_profile_name(None), "default");
        assert!(matches!(
            config.profile("cabin"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }
}
