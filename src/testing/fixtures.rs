//! Test fixtures providing pre-built test objects

use std::sync::Arc;

use crate::session::SessionManager;
use crate::settings::{AuthSettings, ProxySettings, RelaySettings};

use super::constants::{TEST_CARD_NUMBER, TEST_CREDENTIAL, TEST_PASSWORD};
use super::mock::MockAuthenticator;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Auth settings with auto-auth ready to run
    #[must_use]
    pub fn auth_settings() -> AuthSettings {
        AuthSettings {
            card_number: TEST_CARD_NUMBER.to_string(),
            password: TEST_PASSWORD.to_string(),
            ..AuthSettings::default()
        }
    }

    /// Relay settings forwarding Motor traffic to `motor_base_url`
    #[must_use]
    pub fn settings(motor_base_url: &str) -> RelaySettings {
        RelaySettings {
            auth: Self::auth_settings(),
            proxy: ProxySettings {
                motor_base_url: motor_base_url.to_string(),
                request_timeout_seconds: 5,
                ..ProxySettings::default()
            },
            ..RelaySettings::default()
        }
    }

    /// Mock that always logs in with the standard test credential
    #[must_use]
    pub fn authenticator() -> Arc<MockAuthenticator> {
        Arc::new(MockAuthenticator::succeeding(TEST_CREDENTIAL))
    }

    /// Session manager backed by `authenticator`
    #[must_use]
    pub fn session_manager(authenticator: Arc<MockAuthenticator>) -> SessionManager {
        SessionManager::new(authenticator, Self::auth_settings())
    }
}
