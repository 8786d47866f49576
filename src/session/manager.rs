//! Session Manager - server-side credential cache
//!
//! The relay holds exactly one EBSCO session for the whole process. The
//! `SessionManager` owns it, hands out the current credential while it is
//! fresh, and runs the login handshake when it is not.
//!
//! Refreshes are single-flight: the first caller that finds the cache stale
//! starts the handshake, and every caller that arrives while it runs waits for
//! that same attempt and shares its outcome. A started handshake always runs
//! to completion, even if the request that triggered it goes away.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::auth::{AuthError, Authenticator, Credential, EbscoHandshake};
use crate::settings::{AuthSettings, RelaySettings};

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<Credential>,
    expires_at: Option<DateTime<Utc>>,
    refresh_in_progress: bool,
    /// Bumped whenever a refresh finishes, successful or not
    refresh_generation: u64,
}

impl SessionState {
    fn valid_credential(&self, now: DateTime<Utc>) -> Option<Credential> {
        match (&self.credential, self.expires_at) {
            (Some(credential), Some(expires_at)) if now < expires_at => Some(credential.clone()),
            _ => None,
        }
    }
}

/// Snapshot of the session for health reporting
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub refresh_in_progress: bool,
    pub expires_in_minutes: i64,
}

/// Owner of the process-wide EBSCO session
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    settings: AuthSettings,
    state: Arc<RwLock<SessionState>>,
    refresh_lock: Arc<Mutex<()>>,
}

// =============================================================================
// Construction
// =============================================================================

impl SessionManager {
    /// Create a session manager around any authenticator
    #[must_use]
    pub fn new(authenticator: Arc<dyn Authenticator>, settings: AuthSettings) -> Self {
        Self {
            authenticator,
            settings,
            state: Arc::new(RwLock::new(SessionState::default())),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a session manager backed by the real EBSCO handshake
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake cannot be configured from settings
    pub fn from_settings(settings: &RelaySettings) -> Result<Self, AuthError> {
        let handshake = EbscoHandshake::new(&settings.auth, &settings.proxy)?;
        Ok(Self::new(Arc::new(handshake), settings.auth.clone()))
    }

    /// Whether automatic authentication is switched on
    #[must_use]
    pub fn auto_auth_enabled(&self) -> bool {
        self.settings.auto_auth
    }
}

// =============================================================================
// Credential access
// =============================================================================

impl SessionManager {
    /// Return a fresh credential, logging in first if needed
    ///
    /// Never fails: a refresh that does not produce a credential is logged
    /// and reported as `None`, and the next call is free to try again.
    pub async fn ensure_authenticated(&self) -> Option<Credential> {
        let observed_generation = {
            let state = read(&self.state);
            if let Some(credential) = state.valid_credential(Utc::now()) {
                return Some(credential);
            }
            state.refresh_generation
        };

        if !self.settings.auto_auth {
            warn!("⚠️  Auto-authentication is disabled");
            return None;
        }
        if self.settings.password.is_empty() {
            warn!("⚠️  Auto-authentication enabled but password not set!");
            warn!("   Set EBSCO_PASSWORD or configure auth.password in Settings.toml");
            return None;
        }

        let guard = Arc::clone(&self.refresh_lock).lock_owned().await;

        {
            let state = read(&self.state);
            if state.refresh_generation != observed_generation {
                debug!("Reusing the outcome of a refresh that finished while waiting");
                return state.valid_credential(Utc::now());
            }
        }

        info!("🔄 Session expired or not found, re-authenticating...");
        self.refresh(guard).await
    }

    /// Eager first login at startup so the first request skips the handshake
    ///
    /// Returns whether a credential is now held.
    pub async fn startup_authenticate(&self) -> bool {
        if !self.settings.auto_auth_ready() {
            return false;
        }
        info!("🔄 Initializing automatic authentication...");
        self.ensure_authenticated().await.is_some()
    }

    /// Log in with caller-supplied credentials, leaving the cached session alone
    ///
    /// # Errors
    ///
    /// Returns the handshake's error unchanged
    pub async fn authenticate_with(
        &self,
        card_number: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        self.authenticator.authenticate(card_number, password).await
    }

    /// Run one handshake in its own task, holding the refresh lock throughout
    async fn refresh(&self, guard: OwnedMutexGuard<()>) -> Option<Credential> {
        let authenticator = Arc::clone(&self.authenticator);
        let state = Arc::clone(&self.state);
        let card_number = self.settings.card_number.clone();
        let password = self.settings.password.clone();
        let ttl = self.settings.session_ttl();

        let task = tokio::spawn(async move {
            let _guard = guard;
            write(&state).refresh_in_progress = true;

            info!("🔐 Performing automatic EBSCO authentication...");
            info!("   Card Number: {card_number}");
            let outcome = authenticator.authenticate(&card_number, &password).await;

            let mut state = write(&state);
            state.refresh_in_progress = false;
            state.refresh_generation += 1;

            match outcome {
                Ok(credential) => {
                    let Some(expires_at) = Utc::now().checked_add_signed(ttl) else {
                        error!("❌ Session TTL overflows the clock, credential not cached");
                        return Some(credential);
                    };
                    state.credential = Some(credential.clone());
                    state.expires_at = Some(expires_at);
                    info!("✅ Auto-authentication successful!");
                    info!("   Session expires at: {}", expires_at.format("%H:%M:%S UTC"));
                    Some(credential)
                }
                Err(AuthError::NoToken) => {
                    error!("❌ Auto-authentication failed - no auth token received");
                    None
                }
                Err(err) => {
                    error!("❌ Auto-authentication error: {err}");
                    None
                }
            }
        });

        match task.await {
            Ok(credential) => credential,
            Err(err) => {
                error!("❌ Session refresh task aborted: {err}");
                None
            }
        }
    }
}

// =============================================================================
// Reporting
// =============================================================================

impl SessionManager {
    /// Current session status, with the remaining lifetime rounded to minutes
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let state = read(&self.state);
        let remaining_ms = state
            .expires_at
            .map_or(0, |expires_at| (expires_at - Utc::now()).num_milliseconds());

        SessionStatus {
            authenticated: state.credential.is_some(),
            refresh_in_progress: state.refresh_in_progress,
            expires_in_minutes: if remaining_ms > 0 {
                (remaining_ms + 30_000) / 60_000
            } else {
                0
            },
        }
    }
}

fn read(state: &RwLock<SessionState>) -> RwLockReadGuard<'_, SessionState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
