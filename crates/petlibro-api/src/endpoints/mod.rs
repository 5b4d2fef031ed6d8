// Typed endpoint methods on `CloudClient`, grouped by API area.

mod controls;
mod devices;
mod member;

pub use controls::WaterMode;
