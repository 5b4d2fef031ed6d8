//! Session, polling and command layer between `petlibro-api` and consumers
//! (CLI, home-automation bridges).
//!
//! This crate owns the domain model and the reactive snapshot store for a
//! PETLIBRO account:
//!
//! - **[`Bridge`]**: Facade over the full lifecycle:
//!   [`setup()`](Bridge::setup) logs in, discovers devices, runs the first
//!   polling cycle and spawns the polling and command tasks.
//!   [`Bridge::oneshot()`](Bridge::oneshot) runs a single CLI invocation
//!   without scheduled polling.
//!
//! - **[`PollingCoordinator`]**: Periodic refresh. Fetches every device
//!   concurrently, decodes each payload for its class and publishes into the
//!   store. One device failing never blocks the others.
//!
//! - **[`SnapshotStore`]**: Last-known state per device, built on
//!   `DashMap` + `tokio::sync::watch`. Observations older than the stored
//!   one are discarded.
//!
//! - **[`CommandDispatcher`]**: Capability check, parameter validation,
//!   cloud call, then an immediate refresh of the target device.
//!
//! - **Domain model** ([`model`]): [`Device`], [`DeviceClass`] and the
//!   per-class [`DeviceState`] variants, plus the member [`Account`].

pub mod bridge;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod decode;
pub mod error;
pub(crate) mod fetch;
pub mod model;
pub mod registry;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{Bridge, BridgeState};
pub use command::{Ack, Action, ActionKind, Command, CommandDispatcher, capabilities, supports};
pub use config::BridgeConfig;
pub use coordinator::{
    CoordinatorPhase, CycleReport, CycleStatus, DEFAULT_POLL_INTERVAL, DeviceOutcome,
    PollingCoordinator,
};
pub use decode::decode;
pub use error::{CommandError, CoreError, DecodeError};
pub use registry::{DeviceRegistry, DiscoveryDiff};
pub use store::{DeviceSnapshot, PublishOutcome, SnapshotStore};
pub use stream::{Published, Subscription};

pub use model::{
    Account, AccountUpdate, CameraFeederState, CommonState, Device, DeviceClass, DeviceSerial,
    DeviceState, FeederState, FountainState, Gender, LitterBoxState, RfidFeederState,
    RfidFountainState, UnitType,
};
