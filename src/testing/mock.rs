//! Mock authenticator for isolated session and handler tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::auth::{AuthError, Authenticator, Credential};

/// What the next login attempt produces
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Token(String),
    NoToken,
    /// The identity provider answered with this status (or not at all)
    Transport(Option<u16>),
}

/// Authenticator that counts calls and returns a configurable outcome
pub struct MockAuthenticator {
    calls: AtomicUsize,
    outcome: Mutex<MockOutcome>,
    delay: Option<Duration>,
}

impl MockAuthenticator {
    #[must_use]
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: Mutex::new(outcome),
            delay: None,
        }
    }

    /// Every login yields `token`
    #[must_use]
    pub fn succeeding(token: &str) -> Self {
        Self::new(MockOutcome::Token(token.to_string()))
    }

    /// Every login completes without a token
    #[must_use]
    pub fn failing() -> Self {
        Self::new(MockOutcome::NoToken)
    }

    /// Every login fails before reaching the identity provider
    #[must_use]
    pub fn unreachable() -> Self {
        Self::new(MockOutcome::Transport(None))
    }

    /// Make each login take `delay` before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the outcome of later logins (`None` makes them yield no token)
    pub fn set_token(&self, token: Option<&str>) {
        self.set_outcome(token.map_or(MockOutcome::NoToken, |token| {
            MockOutcome::Token(token.to_string())
        }));
    }

    pub fn set_outcome(&self, outcome: MockOutcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Number of logins attempted so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(
        &self,
        _card_number: &str,
        _password: &str,
    ) -> Result<Credential, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match outcome {
            MockOutcome::Token(token) => Ok(Credential::new(token)),
            MockOutcome::NoToken => Err(AuthError::NoToken),
            MockOutcome::Transport(status) => Err(AuthError::Transport {
                status,
                message: "mock identity provider unavailable".to_string(),
            }),
        }
    }
}
