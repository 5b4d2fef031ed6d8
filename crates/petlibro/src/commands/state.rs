//! Device state views.

use std::sync::Arc;

use petlibro_core::{Bridge, CommonState, DeviceSnapshot, DeviceState, FeederState, FountainState};
use tabled::Tabled;

use crate::cli::{GlobalOpts, StateArgs};
use crate::error::CliError;
use crate::output::{self, on_off, or_dash};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Observed")]
    observed: String,
}

impl From<&Arc<DeviceSnapshot>> for SnapshotRow {
    fn from(s: &Arc<DeviceSnapshot>) -> Self {
        Self {
            serial: s.device.serial.to_string(),
            name: s.device.name.clone(),
            class: s.device.class.to_string(),
            available: if s.available { "yes" } else { "no" }.into(),
            level: summary(s.state.as_ref()),
            observed: s.observed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// One-line headline for a state: the level the device is about.
pub fn summary(state: Option<&DeviceState>) -> String {
    match state {
        None | Some(DeviceState::Unclassified(_)) => "-".into(),
        Some(DeviceState::LitterBox(l)) => format!("waste {}%", l.waste_level),
        Some(s) => {
            if let Some(f) = s.feeder() {
                format!("food {}", f.food_remaining)
            } else if let Some(f) = s.fountain() {
                format!("water {}%", f.water_level)
            } else {
                "-".into()
            }
        }
    }
}

// ── Detail view ─────────────────────────────────────────────────────

pub fn detail(s: &Arc<DeviceSnapshot>) -> String {
    let mut lines = vec![
        format!("Serial:     {}", s.device.serial),
        format!("Name:       {}", s.device.name),
        format!("Class:      {}", s.device.class),
        format!("Available:  {}", if s.available { "yes" } else { "no" }),
        format!("Observed:   {}", s.observed_at.to_rfc3339()),
    ];
    if let Some(err) = &s.last_error {
        lines.push(format!("Last error: {err}"));
    }

    let Some(state) = &s.state else {
        return lines.join("\n");
    };
    common_lines(state.common(), &mut lines);

    match state {
        DeviceState::Feeder(f) => feeder_lines(f, &mut lines),
        DeviceState::CameraFeeder(c) => {
            feeder_lines(&c.feeder, &mut lines);
            lines.push(format!("Recording:  {}", on_off(c.camera.video_record)));
            lines.push(format!("Resolution: {}", or_dash(c.camera.resolution.as_deref())));
        }
        DeviceState::RfidFeeder(r) => {
            feeder_lines(&r.feeder, &mut lines);
            lines.push(format!("Pets:       {}", r.rfid_tags.len()));
            lines.push(format!("Visits:     {}", r.visits.len()));
        }
        DeviceState::Fountain(f) => fountain_lines(f, &mut lines),
        DeviceState::RfidFountain(r) => {
            fountain_lines(&r.fountain, &mut lines);
            lines.push(format!("Pets:       {}", r.rfid_tags.len()));
            lines.push(format!("Visits:     {}", r.visits.len()));
        }
        DeviceState::LitterBox(l) => {
            lines.push(format!("Waste:      {}%", l.waste_level));
            lines.push(format!("Used today: {}", or_dash(l.times_used_today)));
            lines.push(format!("Last used:  {}", or_dash(l.last_used.map(|t| t.to_rfc3339()))));
            lines.push(format!("Litter:     {} days left", or_dash(l.litter_remaining_days)));
            lines.push(format!("Auto clean: {}", on_off(l.auto_clean)));
        }
        DeviceState::Unclassified(_) => {}
    }
    lines.join("\n")
}

fn common_lines(c: &CommonState, lines: &mut Vec<String>) {
    lines.push(format!("Online:     {}", on_off(c.online)));
    if let Some(ssid) = &c.wifi_ssid {
        lines.push(format!("Wi-Fi:      {ssid} ({} dBm)", or_dash(c.wifi_rssi)));
    }
    if let Some(battery) = c.battery_percent {
        lines.push(format!("Battery:    {battery}%"));
    }
    if let Some(update) = &c.firmware_update {
        lines.push(format!(
            "Update:     {}",
            or_dash(update.target_version.as_deref())
        ));
    }
}

fn feeder_lines(f: &FeederState, lines: &mut Vec<String>) {
    lines.push(format!("Food:       {}", f.food_remaining));
    lines.push(format!("Food low:   {}", on_off(f.food_low)));
    lines.push(format!("Blocked:    {}", on_off(f.dispenser_blocked)));
    lines.push(format!("Last feed:  {}", or_dash(f.last_feed.map(|t| t.to_rfc3339()))));
    lines.push(format!("Plan:       {}", on_off(f.feeding_plan_enabled)));
    if let Some(plan) = &f.feeding_plan_today {
        for meal in plan {
            lines.push(format!(
                "  {} x{} {}",
                or_dash(meal.time.as_deref()),
                or_dash(meal.portions),
                if meal.completed == Some(true) { "(done)" } else { "" }
            ));
        }
    }
    lines.push(format!("Fed today:  {} times", or_dash(f.today_feeding_times)));
    lines.push(format!("Child lock: {}", on_off(f.child_lock)));
    lines.push(format!("Light:      {}", on_off(f.light)));
    lines.push(format!("Sound:      {}", on_off(f.sound)));
    lines.push(format!("Desiccant:  {} days left", or_dash(f.desiccant_remaining_days)));
}

fn fountain_lines(f: &FountainState, lines: &mut Vec<String>) {
    lines.push(format!("Water:      {}%", f.water_level));
    lines.push(format!("Mode:       {}", or_dash(f.water_mode)));
    lines.push(format!("Today:      {} mL", or_dash(f.today_water_ml)));
    lines.push(format!("Filter:     {} days left", or_dash(f.filter_remaining_days)));
    lines.push(format!("Cleaning:   {} days left", or_dash(f.cleaning_remaining_days)));
    lines.push(format!("Light:      {}", on_off(f.light)));
    lines.push(format!("Sound:      {}", on_off(f.sound)));
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(bridge: &Bridge, args: StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match args.serial {
        Some(identifier) => {
            let serial = util::resolve_serial(bridge, &identifier)?;
            let snapshot = bridge
                .snapshot(&serial)
                .ok_or_else(|| CliError::DeviceNotFound {
                    serial: serial.to_string(),
                })?;
            output::render_single(&global.output, &snapshot, detail, |s| {
                s.device.serial.to_string()
            })?
        }
        None => output::render_list(
            &global.output,
            &bridge.snapshots(),
            |s| SnapshotRow::from(s),
            |s| s.device.serial.to_string(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
