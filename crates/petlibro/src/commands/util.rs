//! Shared helpers for command handlers.

use petlibro_core::{Bridge, DeviceSerial};

use crate::error::CliError;

/// Resolve a serial or a device name (case-insensitive) to a serial via
/// registry lookup.
pub fn resolve_serial(bridge: &Bridge, identifier: &str) -> Result<DeviceSerial, CliError> {
    let devices = bridge.devices();
    devices
        .iter()
        .find(|d| d.serial.as_str() == identifier)
        .or_else(|| {
            devices
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(identifier))
        })
        .map(|d| d.serial.clone())
        .ok_or_else(|| CliError::DeviceNotFound {
            serial: identifier.into(),
        })
}
