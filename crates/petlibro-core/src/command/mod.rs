// ── Command system ──
//
// Typed device actions, their static per-class capability tables, and the
// dispatcher that validates and sends them.

pub mod capability;
pub mod dispatcher;

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use petlibro_api::WaterMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumDiscriminants, EnumIter, EnumString};
use tokio::sync::oneshot;

use crate::error::{CommandError, CoreError};
use crate::model::DeviceSerial;

pub use capability::{capabilities, supports};
pub use dispatcher::CommandDispatcher;

// ── Parameter ranges ────────────────────────────────────────────────

pub const PORTIONS: RangeInclusive<u8> = 1..=12;
pub const VOLUME: RangeInclusive<u8> = 1..=100;
pub const LID_CLOSE_SECS: RangeInclusive<u8> = 1..=10;
pub const CYCLE_DAYS: RangeInclusive<u8> = 1..=60;
pub const WATER_MINUTES: RangeInclusive<u16> = 1..=180;

/// A device action with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "action", rename_all = "snake_case")]
#[strum_discriminants(name(ActionKind))]
#[strum_discriminants(derive(Hash, Display, EnumString, EnumIter, Serialize, Deserialize))]
#[strum_discriminants(strum(serialize_all = "snake_case", ascii_case_insensitive))]
#[strum_discriminants(serde(rename_all = "snake_case"))]
pub enum Action {
    /// Dispense portions right away.
    DispenseNow { portions: u8 },
    SetFeedingPlan { enabled: bool },
    SetChildLock { enabled: bool },
    SetLight { enabled: bool },
    SetSound { enabled: bool },
    SetVolume { volume: u8 },
    SetLidCloseTime { seconds: u8 },
    SetDesiccantCycle { days: u8 },
    ResetDesiccant,
    SetWaterMode { mode: WaterMode },
    SetWaterInterval { minutes: u16 },
    SetWaterDuration { minutes: u16 },
    SetFilterCycle { days: u8 },
    SetCleaningCycle { days: u8 },
    ResetFilter,
    ResetCleaning,
    SetVideoRecord { enabled: bool },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        ActionKind::from(self)
    }

    /// Check parameters against the ranges the devices accept.
    pub fn validate(&self) -> Result<(), CommandError> {
        let kind = self.kind();
        match *self {
            Self::DispenseNow { portions } => check(kind, &PORTIONS, portions, "portions"),
            Self::SetVolume { volume } => check(kind, &VOLUME, volume, "volume"),
            Self::SetLidCloseTime { seconds } => check(kind, &LID_CLOSE_SECS, seconds, "seconds"),
            Self::SetDesiccantCycle { days }
            | Self::SetFilterCycle { days }
            | Self::SetCleaningCycle { days } => check(kind, &CYCLE_DAYS, days, "days"),
            Self::SetWaterInterval { minutes } | Self::SetWaterDuration { minutes } => {
                check(kind, &WATER_MINUTES, minutes, "minutes")
            }
            Self::SetFeedingPlan { .. }
            | Self::SetChildLock { .. }
            | Self::SetLight { .. }
            | Self::SetSound { .. }
            | Self::SetVideoRecord { .. }
            | Self::SetWaterMode { .. }
            | Self::ResetDesiccant
            | Self::ResetFilter
            | Self::ResetCleaning => Ok(()),
        }
    }

    /// Build an action from its kind and a textual value, as typed on a
    /// command line. Switches take `on`/`off`; resets take no value.
    pub fn parse(kind: ActionKind, value: Option<&str>) -> Result<Self, CommandError> {
        let action = match kind {
            ActionKind::DispenseNow => Self::DispenseNow {
                portions: match value {
                    Some(_) => number(kind, value)?,
                    None => 1,
                },
            },
            ActionKind::SetFeedingPlan => Self::SetFeedingPlan { enabled: switch(kind, value)? },
            ActionKind::SetChildLock => Self::SetChildLock { enabled: switch(kind, value)? },
            ActionKind::SetLight => Self::SetLight { enabled: switch(kind, value)? },
            ActionKind::SetSound => Self::SetSound { enabled: switch(kind, value)? },
            ActionKind::SetVideoRecord => Self::SetVideoRecord { enabled: switch(kind, value)? },
            ActionKind::SetVolume => Self::SetVolume { volume: number(kind, value)? },
            ActionKind::SetLidCloseTime => Self::SetLidCloseTime { seconds: number(kind, value)? },
            ActionKind::SetDesiccantCycle => Self::SetDesiccantCycle { days: number(kind, value)? },
            ActionKind::SetFilterCycle => Self::SetFilterCycle { days: number(kind, value)? },
            ActionKind::SetCleaningCycle => Self::SetCleaningCycle { days: number(kind, value)? },
            ActionKind::SetWaterInterval => Self::SetWaterInterval { minutes: number(kind, value)? },
            ActionKind::SetWaterDuration => Self::SetWaterDuration { minutes: number(kind, value)? },
            ActionKind::SetWaterMode => Self::SetWaterMode {
                mode: required(kind, value)?
                    .parse()
                    .map_err(|_| invalid(kind, "expected `constant` or `intermittent`"))?,
            },
            ActionKind::ResetDesiccant => Self::ResetDesiccant,
            ActionKind::ResetFilter => Self::ResetFilter,
            ActionKind::ResetCleaning => Self::ResetCleaning,
        };
        action.validate()?;
        Ok(action)
    }
}

fn check<T>(kind: ActionKind, range: &RangeInclusive<T>, value: T, what: &str) -> Result<(), CommandError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            kind,
            &format!("{what} must be between {} and {}, got {value}", range.start(), range.end()),
        ))
    }
}

fn invalid(action: ActionKind, message: &str) -> CommandError {
    CommandError::InvalidParameter {
        action,
        message: message.to_owned(),
    }
}

fn required(kind: ActionKind, value: Option<&str>) -> Result<&str, CommandError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid(kind, "a value is required"))
}

fn number<T: std::str::FromStr>(kind: ActionKind, value: Option<&str>) -> Result<T, CommandError> {
    let raw = required(kind, value)?;
    raw.parse()
        .map_err(|_| invalid(kind, &format!("`{raw}` is not a valid number")))
}

fn switch(kind: ActionKind, value: Option<&str>) -> Result<bool, CommandError> {
    match required(kind, value)?.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" | "enable" => Ok(true),
        "off" | "false" | "0" | "no" | "disable" => Ok(false),
        other => Err(invalid(kind, &format!("`{other}` is not on/off"))),
    }
}

/// An action addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub serial: DeviceSerial,
    pub action: Action,
}

/// The cloud accepted a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
    pub serial: DeviceSerial,
    pub action: ActionKind,
    pub accepted_at: DateTime<Utc>,
    /// Raw `data` of the acknowledgement, usually `null`.
    pub response: Value,
}

/// A command plus the channel its result is sent back on.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<Ack, CoreError>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn kinds_use_snake_case_names() {
        assert_eq!(ActionKind::DispenseNow.to_string(), "dispense_now");
        assert_eq!(
            "set_water_interval".parse::<ActionKind>().unwrap(),
            ActionKind::SetWaterInterval
        );
        assert_eq!(ActionKind::iter().count(), 17);
    }

    #[test]
    fn ranges_are_enforced() {
        assert!(Action::DispenseNow { portions: 12 }.validate().is_ok());
        assert!(matches!(
            Action::DispenseNow { portions: 0 }.validate(),
            Err(CommandError::InvalidParameter {
                action: ActionKind::DispenseNow,
                ..
            })
        ));
        assert!(Action::SetVolume { volume: 101 }.validate().is_err());
        assert!(Action::SetLidCloseTime { seconds: 11 }.validate().is_err());
        assert!(Action::SetFilterCycle { days: 61 }.validate().is_err());
        assert!(Action::SetWaterDuration { minutes: 181 }.validate().is_err());
        assert!(Action::SetWaterInterval { minutes: 180 }.validate().is_ok());
    }

    #[test]
    fn parse_from_command_line_values() {
        assert_eq!(
            Action::parse(ActionKind::DispenseNow, None).unwrap(),
            Action::DispenseNow { portions: 1 }
        );
        assert_eq!(
            Action::parse(ActionKind::SetChildLock, Some("ON")).unwrap(),
            Action::SetChildLock { enabled: true }
        );
        assert_eq!(
            Action::parse(ActionKind::SetWaterMode, Some("intermittent")).unwrap(),
            Action::SetWaterMode {
                mode: WaterMode::Intermittent
            }
        );
        assert_eq!(
            Action::parse(ActionKind::ResetFilter, None).unwrap(),
            Action::ResetFilter
        );
        assert!(Action::parse(ActionKind::SetVolume, Some("loud")).is_err());
        assert!(Action::parse(ActionKind::SetVolume, None).is_err());
        assert!(Action::parse(ActionKind::SetVolume, Some("0")).is_err());
    }

    #[test]
    fn actions_serialize_with_a_tag() {
        let json = serde_json::to_value(Action::SetVolume { volume: 40 }).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "set_volume", "volume": 40 }));
    }
}
