// ── Domain model ──
//
// Canonical types the rest of the crate (and its consumers) work with.
// Wire shapes stay in petlibro-api.

pub mod account;
pub mod device;
pub mod ids;
pub mod state;

pub use account::{Account, AccountUpdate, Gender, UnitType};
pub use device::{Device, DeviceClass};
pub use ids::{DeviceSerial, MacAddress};
pub use state::{
    CameraFeederState, CameraState, CommonState, DeviceState, FeederState, FirmwareUpdate,
    FountainState, LitterBoxState, PetVisit, PlannedMeal, RfidFeederState, RfidFountainState,
    RfidTag,
};
