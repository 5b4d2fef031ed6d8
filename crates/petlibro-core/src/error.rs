// ── Core error types ──
//
// `DecodeError` and `CommandError` are the per-operation failures of the
// decoder and the dispatcher. `CoreError` is what the `Bridge` facade
// returns; auth failures are lifted out of `TransportError::Auth` so
// callers can match on them directly.

use petlibro_api::{AuthError, TransportError};
use thiserror::Error;

use crate::command::ActionKind;
use crate::model::{DeviceClass, DeviceSerial};

/// A raw payload could not be turned into a `DeviceState`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("required field `{field}` is missing")]
    MissingField { field: &'static str },

    #[error("field `{field}` has an unexpected shape (expected {expected})")]
    UnknownShape {
        field: String,
        expected: &'static str,
    },
}

/// A command was refused locally or by the cloud.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{action} is not supported by {class} devices")]
    Unsupported {
        class: DeviceClass,
        action: ActionKind,
    },

    #[error("invalid value for {action}: {message}")]
    InvalidParameter { action: ActionKind, message: String },

    #[error("unknown device: {serial}")]
    UnknownDevice { serial: DeviceSerial },

    #[error("rejected by the cloud (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error(transparent)]
    Transport(TransportError),
}

impl From<TransportError> for CommandError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Api { code, message } => Self::Rejected { code, message },
            other => Self::Transport(other),
        }
    }
}

/// Unified error type for the `Bridge` facade.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Auth(AuthError),

    // ── Cloud ────────────────────────────────────────────────────────
    #[error("Cloud request failed: {0}")]
    Transport(TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    // ── Commands ─────────────────────────────────────────────────────
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Bridge is not set up")]
    NotReady,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the failure needs new credentials rather than a retry.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::Transport(e) | Self::Command(CommandError::Transport(e)) => e.is_auth_failure(),
            _ => false,
        }
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<TransportError> for CoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Auth(auth) => Self::Auth(auth),
            TransportError::InvalidUrl(e) => Self::Config {
                message: format!("invalid cloud URL: {e}"),
            },
            other => Self::Transport(other),
        }
    }
}
