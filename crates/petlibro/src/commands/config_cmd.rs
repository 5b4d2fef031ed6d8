//! Config file management. Runs without a cloud session.

use std::io::IsTerminal;

use petlibro_config::{Config, Profile, config_path, load_config, save_config};
use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::config::available_profiles;
use crate::error::CliError;
use crate::output;

/// Profile view with the password replaced by a marker.
#[derive(Serialize)]
struct RedactedProfile<'a> {
    name: &'a str,
    email: Option<&'a str>,
    password: Option<&'static str>,
    password_env: Option<&'a str>,
    region: String,
    base_url: Option<&'a str>,
    poll_interval: Option<u64>,
    time_zone: Option<&'a str>,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => show(global),
        ConfigCommand::Init(init_args) => init(init_args, global),
    }
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load_config()?;
    let mut profiles: Vec<RedactedProfile<'_>> = cfg
        .profiles
        .iter()
        .map(|(name, p)| redact(name, p))
        .collect();
    profiles.sort_by_key(|p| p.name);

    let out = output::render_single(
        &global.output,
        &profiles,
        |list| {
            let mut lines = vec![
                format!("Config:   {}", config_path().display()),
                format!("Default:  {}", cfg.default_profile.as_deref().unwrap_or("-")),
                format!("Profiles: {}", available_profiles(&cfg)),
            ];
            for p in list {
                lines.push(format!(
                    "  {}: {} ({}, poll {}s)",
                    p.name,
                    p.email.unwrap_or("-"),
                    p.region,
                    p.poll_interval.unwrap_or(cfg.defaults.poll_interval)
                ));
            }
            lines.join("\n")
        },
        |list| {
            list.iter()
                .map(|p| p.name.to_owned())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn redact<'a>(name: &'a str, p: &'a Profile) -> RedactedProfile<'a> {
    RedactedProfile {
        name,
        email: p.email.as_deref(),
        password: p.password.as_ref().map(|_| "********"),
        password_env: p.password_env.as_deref(),
        region: p.region.to_string(),
        base_url: p.base_url.as_deref(),
        poll_interval: p.poll_interval,
        time_zone: p.time_zone.as_deref(),
    }
}

fn init(args: ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = load_config().unwrap_or_else(|_| Config::default());
    let name = cfg.active_profile_name(global.profile.as_deref());

    // Without a password variable, store the password typed at the prompt.
    let password = if args.password_env.is_none() && std::io::stdin().is_terminal() {
        let typed = rpassword::prompt_password("PETLIBRO password (empty to skip): ")?;
        (!typed.is_empty()).then_some(typed)
    } else {
        None
    };

    cfg.profiles.insert(
        name.clone(),
        Profile {
            email: Some(args.email),
            password,
            password_env: args.password_env,
            poll_interval: args.poll_interval,
            time_zone: args.time_zone,
            ..Profile::default()
        },
    );
    if args.make_default || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(name.clone());
    }
    save_config(&cfg)?;

    if !global.quiet {
        eprintln!("Profile '{name}' written to {}", config_path().display());
    }
    Ok(())
}
