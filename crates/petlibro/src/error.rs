//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use petlibro_api::{AuthError, TransportError};
use petlibro_config::ConfigError;
use petlibro_core::{CommandError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the PETLIBRO cloud")]
    #[diagnostic(
        code(petlibro::connection_failed),
        help("Check your network connection and try again.")
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Rate limited by the cloud")]
    #[diagnostic(
        code(petlibro::rate_limited),
        help("Wait {retry_after_secs}s before retrying, or poll less often.")
    )]
    RateLimited { retry_after_secs: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(petlibro::auth_failed),
        help(
            "Verify the email and password you use in the PETLIBRO app.\n\
             Set PETLIBRO_PASSWORD or run: petlibro config init --email <EMAIL>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(petlibro::no_credentials),
        help(
            "Configure a profile with: petlibro config init --email <EMAIL>\n\
             Or set PETLIBRO_EMAIL and PETLIBRO_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{serial}' not found")]
    #[diagnostic(
        code(petlibro::not_found),
        help("Run: petlibro devices to see available devices")
    )]
    DeviceNotFound { serial: String },

    #[error("A {class} does not support '{action}'")]
    #[diagnostic(
        code(petlibro::unsupported),
        help("Run: petlibro capabilities <SERIAL> to see what this device accepts")
    )]
    Unsupported { class: String, action: String },

    #[error("Device data could not be read: {message}")]
    #[diagnostic(code(petlibro::decode))]
    Decode { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Cloud API error ({code}): {message}")]
    #[diagnostic(code(petlibro::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(petlibro::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(petlibro::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: petlibro config init --email <EMAIL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(petlibro::config))]
    Config(ConfigError),

    #[error("The bridge is not ready")]
    #[diagnostic(code(petlibro::not_ready))]
    NotReady,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(petlibro::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RateLimited { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth(auth) => auth.into(),
            CoreError::Transport(transport) => transport.into(),
            CoreError::Decode(decode) => CliError::Decode {
                message: decode.to_string(),
            },
            CoreError::Command(command) => command.into(),
            CoreError::DeviceNotFound { serial } => CliError::DeviceNotFound { serial },
            CoreError::NotReady => CliError::NotReady,
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NetworkUnavailable(source) => CliError::ConnectionFailed {
                source: Box::new(source),
            },
            other => CliError::AuthFailed {
                message: other.to_string(),
            },
        }
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Auth(auth) => auth.into(),
            TransportError::Unauthorized { message } => CliError::AuthFailed { message },
            TransportError::Unreachable(source) | TransportError::Client(source) => {
                CliError::ConnectionFailed {
                    source: Box::new(source),
                }
            }
            TransportError::RateLimited { retry_after_secs } => {
                CliError::RateLimited { retry_after_secs }
            }
            TransportError::Api { code, message } => CliError::ApiError {
                code: code.to_string(),
                message,
            },
            TransportError::Http { status, message } => CliError::ApiError {
                code: format!("http {status}"),
                message,
            },
            TransportError::InvalidUrl(e) => CliError::Validation {
                field: "base_url".into(),
                reason: e.to_string(),
            },
            TransportError::Deserialization { message, .. } => CliError::ApiError {
                code: "deserialization".into(),
                message,
            },
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Unsupported { class, action } => CliError::Unsupported {
                class: class.to_string(),
                action: action.to_string(),
            },
            CommandError::InvalidParameter { action, message } => CliError::Validation {
                field: action.to_string(),
                reason: message,
            },
            CommandError::UnknownDevice { serial } => CliError::DeviceNotFound {
                serial: serial.to_string(),
            },
            CommandError::Rejected { code, message } => CliError::ApiError {
                code: code.to_string(),
                message,
            },
            CommandError::Transport(transport) => transport.into(),
        }
    }
}
