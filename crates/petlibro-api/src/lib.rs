// petlibro-api: Async Rust client for the PETLIBRO cloud API
//
// Session login, authenticated request transport with one-shot re-login,
// and typed wrappers over the device, member and control endpoints.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use auth::{Credentials, Region, Session};
pub use client::CloudClient;
pub use endpoints::WaterMode;
pub use error::{AuthError, TransportError};
pub use models::{MaintenanceKey, RawDevice};
pub use session::{AuthSession, DEFAULT_SESSION_TTL, TokenSource};
pub use transport::TransportConfig;
