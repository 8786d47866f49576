//! Server-side EBSCO session
//!
//! - [`manager`] - the process-wide credential cache with single-flight refresh

pub mod manager;

pub use manager::{SessionManager, SessionStatus};
