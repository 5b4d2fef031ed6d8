#![allow(clippy::unwrap_used)]
// Loading and saving config files on disk.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use petlibro_config::{
    Config, Profile, load_config_from, profile_to_bridge_config, save_config_to,
};

const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
poll_interval = 120

[profiles.home]
email = "owner@example.com"
password = "hunter2"
region = "US"
rediscover_every = 10

[profiles.cabin]
email = "cabin@example.com"
password = "pw"
base_url = "http://127.0.0.1:9000"
poll_interval = 0
"#;

#[test]
fn test_loads_profiles_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.default_profile.as_deref(), Some("home"));
    assert_eq!(config.defaults.poll_interval, 120);
    assert_eq!(config.defaults.timeout, 30);
    assert_eq!(config.profiles.len(), 2);

    let name = config.active_profile_name(None);
    let bridge = profile_to_bridge_config(config.profile(&name).unwrap(), &name, &config.defaults)
        .unwrap();
    assert_eq!(bridge.email, "owner@example.com");
    assert_eq!(bridge.password.expose_secret(), "hunter2");
    assert_eq!(bridge.poll_interval, Duration::from_secs(120));
    assert_eq!(bridge.rediscover_every, 10);
    assert!(bridge.base_url.is_none());

    let cabin = config.profile("cabin").unwrap();
    let bridge = profile_to_bridge_config(cabin, "cabin", &config.defaults).unwrap();
    assert!(bridge.poll_interval.is_zero());
    assert_eq!(
        bridge.resolved_base_url().unwrap().as_str(),
        "http://127.0.0.1:9000/"
    );
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert!(config.profiles.is_empty());
    assert_eq!(config.defaults.output, "table");
}

#[test]
fn test_saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            email: Some("owner@example.com".into()),
            password_env: Some("HOME_PETLIBRO_PW".into()),
            time_zone: Some("America/Chicago".into()),
            ..Profile::default()
        },
    );
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let profile = loaded.profile("default").unwrap();
    assert_eq!(profile.password_env.as_deref(), Some("HOME_PETLIBRO_PW"));
    assert_eq!(profile.time_zone.as_deref(), Some("America/Chicago"));
}

#[test]
fn test_invalid_region_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[profiles.home]\nemail = \"a@b.c\"\nregion = \"MARS\"\n",
    )
    .unwrap();

    assert!(load_config_from(&path).is_err());
}
