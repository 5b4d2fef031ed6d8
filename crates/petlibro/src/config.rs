//! Translation of config file + global flags into a `BridgeConfig`.
//!
//! Core never sees these types; it receives a pre-built `BridgeConfig`.

use std::io::IsTerminal;
use std::time::Duration;

use petlibro_config::{
    Config, Defaults, EMAIL_ENV, Profile, build_bridge_config, resolve_password,
};
use petlibro_core::BridgeConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build a `BridgeConfig` from the config file, the active profile, and
/// CLI overrides.
pub fn bridge_config(global: &GlobalOpts) -> Result<BridgeConfig, CliError> {
    let cfg = petlibro_config::load_config()?;
    let profile_name = cfg.active_profile_name(global.profile.as_deref());

    let mut config = match cfg.profiles.get(&profile_name) {
        Some(profile) => from_profile(profile, &profile_name, &cfg.defaults, global)?,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        // No profile: flags and env alone.
        None => from_profile(&Profile::default(), &profile_name, &cfg.defaults, global)?,
    };

    if let Some(raw) = &global.base_url {
        config.base_url = Some(raw.parse().map_err(|_| CliError::Validation {
            field: "base-url".into(),
            reason: format!("invalid URL: {raw}"),
        })?);
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs.max(1));
    }
    Ok(config)
}

fn from_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<BridgeConfig, CliError> {
    let email = global
        .email
        .clone()
        .or_else(|| profile.email.clone())
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.into(),
        })?;

    // No password anywhere: ask when attached to a terminal.
    let password = match resolve_password(profile, profile_name) {
        Ok(password) => password,
        Err(_) => prompt_password(profile_name)?,
    };

    Ok(build_bridge_config(profile, defaults, email, password)?)
}

fn prompt_password(profile_name: &str) -> Result<SecretString, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    let password = rpassword::prompt_password("PETLIBRO password: ")?;
    if password.is_empty() {
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    Ok(SecretString::from(password))
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
