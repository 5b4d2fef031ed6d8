//! Clap derive structures for the `petlibro` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use petlibro_core::{ActionKind, Gender, UnitType};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// petlibro -- query and control PETLIBRO pet appliances
#[derive(Debug, Parser)]
#[command(
    name = "petlibro",
    version,
    about = "Query and control PETLIBRO feeders, fountains and litter boxes",
    long_about = "Talks to the PETLIBRO cloud with your app account.\n\n\
        One-shot commands log in, run, and log out. `watch` keeps a session\n\
        open and prints device changes as they are polled.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "PETLIBRO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account email (overrides profile)
    #[arg(long, short = 'e', global = true)]
    pub email: Option<String>,

    /// API base URL (overrides the region host)
    #[arg(long, env = "PETLIBRO_BASE_URL", global = true, hide = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PETLIBRO_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "PETLIBRO_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices on the account
    #[command(alias = "dev", alias = "ls")]
    Devices,

    /// Show the last polled state of one or all devices
    #[command(alias = "st")]
    State(StateArgs),

    /// Keep polling and print device changes until interrupted
    Watch(WatchArgs),

    /// Dispense food right away
    Feed(FeedArgs),

    /// Send a device action
    #[command(alias = "cmd")]
    Command(CommandArgs),

    /// List the actions a device accepts
    #[command(alias = "caps")]
    Capabilities(CapabilitiesArgs),

    /// Show or update the account profile
    Account(AccountArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StateArgs {
    /// Device serial; all devices when omitted
    pub serial: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Polling period, e.g. "30s" or "2m" (defaults to the profile setting)
    #[arg(long, short = 'i')]
    pub interval: Option<humantime::Duration>,
}

#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Feeder serial
    pub serial: String,

    /// Portions to dispense (1-12)
    #[arg(default_value_t = 1)]
    pub portions: u8,
}

#[derive(Debug, Args)]
pub struct CommandArgs {
    /// Device serial
    pub serial: String,

    /// Action name, e.g. set_light, set_water_mode, reset_filter
    pub action: ActionKind,

    /// Action value: on/off for switches, a number, or a water mode
    pub value: Option<String>,
}

#[derive(Debug, Args)]
pub struct CapabilitiesArgs {
    /// Device serial
    pub serial: String,
}

// ── Account commands ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Show the account profile and unit settings
    Show,

    /// Change profile fields or unit settings
    Update(AccountUpdateArgs),
}

#[derive(Debug, Args)]
pub struct AccountUpdateArgs {
    #[arg(long)]
    pub nickname: Option<String>,

    /// none, male or female
    #[arg(long)]
    pub gender: Option<Gender>,

    /// Unit for food amounts (cups, ounces, grams, ...)
    #[arg(long)]
    pub feed_unit: Option<UnitType>,

    /// Unit for water amounts
    #[arg(long)]
    pub water_unit: Option<UnitType>,

    /// Unit for weights
    #[arg(long)]
    pub weight_unit: Option<UnitType>,
}

// ── Config commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init(ConfigInitArgs),

    /// Print the config file location
    Path,

    /// Show the loaded configuration (passwords redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Read the password from this environment variable instead of storing it
    #[arg(long)]
    pub password_env: Option<String>,

    /// Seconds between polling cycles in `watch`
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// IANA time zone, e.g. "Europe/Berlin"
    #[arg(long)]
    pub time_zone: Option<String>,

    /// Make this the default profile
    #[arg(long)]
    pub make_default: bool,
}
