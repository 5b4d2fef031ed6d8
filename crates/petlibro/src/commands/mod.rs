//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod account;
pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod state;
pub mod util;
pub mod watch;

use petlibro_core::{Bridge, BridgeConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a cloud-bound command to the appropriate handler.
///
/// `watch` keeps its own long-lived bridge; everything else runs inside a
/// single connect / run / disconnect cycle.
pub async fn dispatch(
    cmd: Command,
    config: BridgeConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Command::Watch(args) = &cmd {
        return watch::handle(config, args, global).await;
    }

    Bridge::oneshot(config, |bridge| async move {
        Ok(match cmd {
            Command::Devices => devices::handle(&bridge, global),
            Command::State(args) => state::handle(&bridge, args, global),
            Command::Feed(args) => control::feed(&bridge, &args, global).await,
            Command::Command(args) => control::command(&bridge, &args, global).await,
            Command::Capabilities(args) => control::capabilities_of(&bridge, &args, global),
            Command::Account(args) => account::handle(&bridge, args, global).await,
            // Config is handled before dispatch, watch above
            Command::Config(_) | Command::Watch(_) => unreachable!(),
        })
    })
    .await?
}
