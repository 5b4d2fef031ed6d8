//! Long-running watch mode: keeps a session open and prints every device
//! whose snapshot changed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use petlibro_core::{Bridge, BridgeConfig, CycleStatus, DeviceSerial, DeviceSnapshot};
use tracing::{info, warn};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::state;

pub async fn handle(
    mut config: BridgeConfig,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(interval) = args.interval {
        config.poll_interval = interval.into();
    }
    if config.poll_interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "watch needs a non-zero polling interval".into(),
        });
    }

    let bridge = Bridge::new(config);
    bridge.setup().await?;
    let result = watch_loop(&bridge, global).await;
    bridge.teardown().await;
    result
}

async fn watch_loop(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let mut snapshots = bridge.subscribe();
    let mut reports = bridge.cycle_reports().await?;
    let mut seen: HashMap<DeviceSerial, DateTime<Utc>> = HashMap::new();

    print_changes(snapshots.current(), &mut seen, global)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break;
            }
            changed = snapshots.changed() => {
                let Some(current) = changed else { break };
                print_changes(&current, &mut seen, global)?;
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report {
                    match report.status {
                        CycleStatus::Failed | CycleStatus::Partial => warn!(
                            cycle = report.cycle,
                            failed = report.failures(),
                            "poll cycle had failures"
                        ),
                        CycleStatus::Ok | CycleStatus::Empty => info!(
                            cycle = report.cycle,
                            devices = report.devices.len(),
                            "poll cycle finished"
                        ),
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_changes(
    current: &[Arc<DeviceSnapshot>],
    seen: &mut HashMap<DeviceSerial, DateTime<Utc>>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    for snapshot in current {
        let serial = snapshot.serial();
        if seen.get(serial) == Some(&snapshot.updated_at) {
            continue;
        }
        seen.insert(serial.clone(), snapshot.updated_at);
        output::print_output(&line(snapshot, &global.output)?, global.quiet);
    }
    Ok(())
}

fn line(s: &Arc<DeviceSnapshot>, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => {
            let mut text = format!(
                "{} {} ({}): {}",
                s.observed_at.format("%H:%M:%S"),
                s.device.serial,
                s.device.name,
                state::summary(s.state.as_ref()),
            );
            if !s.available {
                text.push_str(" [unavailable]");
            }
            text
        }
        // One object per line, so json is always compact here.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(s.as_ref())?,
        OutputFormat::Plain => s.device.serial.to_string(),
    })
}
