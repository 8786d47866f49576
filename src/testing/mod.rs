//! Unified testing utilities
//!
//! - [`fixtures`] - pre-built settings and session managers
//! - [`mock`] - a scriptable, counting stand-in for the login handshake

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{MockAuthenticator, MockOutcome};

/// Common test constants
pub mod constants {
    /// Card number used by test settings
    pub const TEST_CARD_NUMBER: &str = "1234";

    /// Password used by test settings
    pub const TEST_PASSWORD: &str = "secret";

    /// Credential handed out by the default mock
    pub const TEST_CREDENTIAL: &str = "ebsco-auth=XYZ";
}
