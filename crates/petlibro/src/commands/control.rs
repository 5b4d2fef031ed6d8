//! Device actions: feeding, generic commands, capability listing.

use petlibro_core::{Ack, Action, ActionKind, Bridge, Command, capabilities};
use tabled::Tabled;

use crate::cli::{CapabilitiesArgs, CommandArgs, FeedArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct CapabilityRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Value")]
    value: &'static str,
}

fn value_hint(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::DispenseNow => "portions 1-12 (default 1)",
        ActionKind::SetFeedingPlan
        | ActionKind::SetChildLock
        | ActionKind::SetLight
        | ActionKind::SetSound
        | ActionKind::SetVideoRecord => "on | off",
        ActionKind::SetVolume => "1-100",
        ActionKind::SetLidCloseTime => "seconds 1-10",
        ActionKind::SetDesiccantCycle | ActionKind::SetFilterCycle | ActionKind::SetCleaningCycle => {
            "days 1-60"
        }
        ActionKind::SetWaterMode => "constant | intermittent",
        ActionKind::SetWaterInterval | ActionKind::SetWaterDuration => "minutes 1-180",
        ActionKind::ResetDesiccant | ActionKind::ResetFilter | ActionKind::ResetCleaning => "-",
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn feed(bridge: &Bridge, args: &FeedArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let serial = util::resolve_serial(bridge, &args.serial)?;
    let action = Action::DispenseNow {
        portions: args.portions,
    };
    let ack = bridge.execute(Command { serial, action }).await?;
    report(&ack, global)
}

pub async fn command(
    bridge: &Bridge,
    args: &CommandArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let serial = util::resolve_serial(bridge, &args.serial)?;
    let action = Action::parse(args.action, args.value.as_deref())?;
    let ack = bridge.execute(Command { serial, action }).await?;
    report(&ack, global)
}

pub fn capabilities_of(
    bridge: &Bridge,
    args: &CapabilitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let serial = util::resolve_serial(bridge, &args.serial)?;
    let device = bridge
        .device(&serial)
        .ok_or_else(|| CliError::DeviceNotFound {
            serial: serial.to_string(),
        })?;

    let kinds = capabilities(device.class);
    if kinds.is_empty() && !global.quiet {
        eprintln!("{} ({}) is read-only", device.name, device.class);
    }
    let out = output::render_list(
        &global.output,
        kinds,
        |k| CapabilityRow {
            action: k.to_string(),
            value: value_hint(*k),
        },
        ToString::to_string,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn report(ack: &Ack, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        &global.output,
        ack,
        |a| format!("{} accepted by {}", a.action, a.serial),
        |a| a.serial.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
