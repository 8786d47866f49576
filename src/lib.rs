#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the motor-relay application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod auth;
pub mod error;
pub mod forwarder;
pub mod handlers;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use auth::{Authenticator, Credential, EbscoHandshake};
pub use error::RelayError;
pub use forwarder::{Forwarder, Upstream};
pub use session::SessionManager;
pub use settings::RelaySettings;
