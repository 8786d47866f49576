//! EBSCO login handshake
//!
//! - [`handshake`] - the multi-step cookie login against the identity provider
//!
//! The [`Authenticator`] trait is the seam the session cache depends on, so the
//! cache can be exercised without a live identity provider.

pub mod handshake;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use handshake::{EbscoHandshake, LoginEndpoints};

/// Opaque cookie/token string attached to upstream requests
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

// Never print the secret itself
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}

/// Login handshake failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// The flow completed but nothing usable came back
    #[error("no auth token received")]
    NoToken,

    /// A step could not be completed
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid login URL: {0}")]
    InvalidUrl(String),
}

impl AuthError {
    /// HTTP status that caused the failure, when the identity provider answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Something that can turn a card number and password into a credential
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run a full login and return the resulting credential
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any step of the login fails at the transport or HTTP level
    /// - The login completes without yielding a credential
    async fn authenticate(&self, card_number: &str, password: &str)
        -> Result<Credential, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("ebsco-auth=secret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret"));
        assert_eq!(credential.as_str(), "ebsco-auth=secret");
    }

    #[test]
    fn test_auth_error_status() {
        let err = AuthError::Transport {
            status: Some(403),
            message: "forbidden".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(AuthError::NoToken.status(), None);
    }
}
