//! Device listing.

use std::sync::Arc;

use petlibro_core::{Bridge, Device};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Online")]
    online: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            serial: d.serial.to_string(),
            name: d.name.clone(),
            class: d.class.to_string(),
            model: d
                .product_name
                .clone()
                .or_else(|| d.product_identifier.clone())
                .unwrap_or_default(),
            firmware: output::or_dash(d.firmware_version.as_deref()),
            online: if d.online { "yes" } else { "no" }.into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = bridge.devices();
    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow::from(d),
        |d| d.serial.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
