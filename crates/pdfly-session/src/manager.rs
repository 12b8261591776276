//! Session state machine
//!
//! ```text
//! Unauthenticated ──login / check──▶ Verifying ──valid──▶ Authenticated
//!        ▲                               │                     │
//!        └────────invalid / no token─────┘◀──logout / expiry───┘
//! ```
//!
//! Every write to the credential store bumps a generation counter while the
//! state lock is held. A verification result is applied only if the
//! generation it started from is still current, so a login always beats an
//! older in-flight check no matter which completes first.

use crate::backend::AuthBackend;
use crate::config::ClientConfig;
use crate::credential::CredentialStore;
use crate::error::SessionError;
use crate::token::decode_unverified;
use pdfly_types::{LoginRequest, SignupRequest, TokenClaims, VerifyTokenResponse};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthState {
    Unauthenticated,
    Verifying,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl From<TokenClaims> for User {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            username: claims.username,
        }
    }
}

/// Snapshot of the session as seen by the rest of the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub state: AuthState,
    pub user: Option<User>,
}

impl Session {
    fn unauthenticated() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            user: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state == AuthState::Verifying
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(User),
    LoggedOut,
    /// The stored credential was rejected or vanished and has been discarded
    Expired,
}

struct Tracked {
    session: Session,
    generation: u64,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn CredentialStore>,
    config: ClientConfig,
    state: Mutex<Tracked>,
    events: broadcast::Sender<SessionEvent>,
    revalidation: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = self.revalidation.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

/// Owns the session state, the credential store and the revalidation task.
/// Clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Starts in `Verifying`; call [`SessionManager::start`] to resolve the
    /// persisted credential.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn CredentialStore>,
        config: ClientConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                config,
                state: Mutex::new(Tracked {
                    session: Session {
                        state: AuthState::Verifying,
                        user: None,
                    },
                    generation: 0,
                }),
                events,
                revalidation: Mutex::new(None),
            }),
        }
    }

    pub async fn start(&self) -> bool {
        self.check_auth().await
    }

    pub fn session(&self) -> Session {
        self.lock_state().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_state().session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().session.is_loading()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Authenticate and store the issued credential. The session is derived
    /// from the token payload without another round trip. On failure the
    /// store is untouched.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        let started = {
            let mut tracked = self.lock_state();
            let flipped = tracked.session.state == AuthState::Unauthenticated;
            if flipped {
                tracked.session.state = AuthState::Verifying;
            }
            (tracked.generation, flipped)
        };

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let outcome = self
            .inner
            .backend
            .login(&request)
            .await
            .and_then(|response| {
                let claims = decode_unverified(&response.token)?;
                Ok((response.token, claims))
            });

        let (token, claims) = match outcome {
            Ok(issued) => issued,
            Err(e) => {
                warn!(error = %e, "login failed");
                self.undo_verifying(started);
                return false;
            }
        };

        let user = User::from(claims);
        {
            let mut tracked = self.lock_state();
            if let Err(e) = self.inner.store.set(&token) {
                warn!(error = %e, "could not persist credential");
                drop(tracked);
                self.undo_verifying(started);
                return false;
            }
            tracked.generation += 1;
            tracked.session = Session {
                state: AuthState::Authenticated,
                user: Some(user.clone()),
            };
        }

        info!(user_id = %user.id, "logged in");
        let _ = self.inner.events.send(SessionEvent::LoggedIn(user));
        self.start_revalidation();
        true
    }

    /// Clear the credential and end the session. Safe to call repeatedly.
    pub fn logout(&self) {
        let was = {
            let mut tracked = self.lock_state();
            if let Err(e) = self.inner.store.remove() {
                warn!(error = %e, "could not clear credential");
            }
            tracked.generation += 1;
            std::mem::replace(&mut tracked.session, Session::unauthenticated()).state
        };
        self.stop_revalidation();

        if was != AuthState::Unauthenticated {
            info!("logged out");
            let _ = self.inner.events.send(SessionEvent::LoggedOut);
        }
    }

    /// Verify the stored credential and update the session accordingly.
    /// Without a stored credential this resolves `false` without contacting
    /// the backend.
    pub async fn check_auth(&self) -> bool {
        let token = self.stored_token();

        let Some(token) = token else {
            let was = {
                let mut tracked = self.lock_state();
                std::mem::replace(&mut tracked.session, Session::unauthenticated()).state
            };
            if was == AuthState::Authenticated {
                self.stop_revalidation();
                let _ = self.inner.events.send(SessionEvent::Expired);
            }
            return false;
        };

        let generation = {
            let mut tracked = self.lock_state();
            if tracked.session.state == AuthState::Unauthenticated {
                tracked.session.state = AuthState::Verifying;
            }
            tracked.generation
        };

        let verdict = self.inner.backend.verify(&token).await;
        self.apply_verification(generation, verdict)
    }

    /// Ask the backend whether `token` (or the stored credential) is valid.
    /// Never changes the session.
    pub async fn verify_token(&self, token: Option<&str>) -> bool {
        let token = match token {
            Some(token) => token.to_string(),
            None => match self.stored_token() {
                Some(token) => token,
                None => return false,
            },
        };

        match self.inner.backend.verify(&token).await {
            Ok(response) => response.valid,
            Err(e) => {
                warn!(error = %e, "token probe failed");
                false
            }
        }
    }

    /// Create an account. The session is unaffected; callers log in
    /// afterwards.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> bool {
        let request = SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            username: username.to_string(),
        };
        match self.inner.backend.signup(&request).await {
            Ok(response) => {
                info!(user_id = %response.user_id, "account created");
                true
            }
            Err(e) => {
                warn!(error = %e, "signup failed");
                false
            }
        }
    }

    /// `Authorization` value for an outgoing request. A stored credential is
    /// re-verified first; if it no longer holds, the session is ended and
    /// the public key is used instead.
    pub async fn authorization_header(&self) -> String {
        if self.stored_token().is_some() && self.check_auth().await {
            if let Some(token) = self.stored_token() {
                return format!("Bearer {}", token);
            }
        }
        format!("Bearer {}", self.inner.config.public_key)
    }

    fn apply_verification(
        &self,
        generation: u64,
        verdict: Result<VerifyTokenResponse, SessionError>,
    ) -> bool {
        let accepted = match verdict {
            Ok(VerifyTokenResponse {
                valid: true,
                payload: Some(claims),
                ..
            }) => Ok(User::from(claims)),
            Ok(response) => Err(SessionError::TokenInvalid(
                response.error.unwrap_or_else(|| "rejected".to_string()),
            )),
            Err(e) => Err(e),
        };
        let valid = accepted.is_ok();

        let mut tracked = self.lock_state();
        if tracked.generation != generation {
            debug!(
                started = generation,
                current = tracked.generation,
                "discarding stale verification"
            );
            return valid;
        }

        match accepted {
            Ok(user) => {
                let was = tracked.session.state;
                tracked.session = Session {
                    state: AuthState::Authenticated,
                    user: Some(user),
                };
                drop(tracked);
                if was != AuthState::Authenticated {
                    info!("session restored");
                    self.start_revalidation();
                }
            }
            Err(e) => {
                if let Err(store_err) = self.inner.store.remove() {
                    warn!(error = %store_err, "could not clear credential");
                }
                tracked.generation += 1;
                tracked.session = Session::unauthenticated();
                drop(tracked);

                info!(reason = %e, "credential discarded");
                self.stop_revalidation();
                let _ = self.inner.events.send(SessionEvent::Expired);
            }
        }
        valid
    }

    /// Revert a `Verifying` flag set by a login that did not go through
    fn undo_verifying(&self, (generation, flipped): (u64, bool)) {
        let mut tracked = self.lock_state();
        if flipped
            && tracked.generation == generation
            && tracked.session.state == AuthState::Verifying
        {
            tracked.session = Session::unauthenticated();
        }
    }

    fn stored_token(&self) -> Option<String> {
        match self.inner.store.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not read credential");
                None
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Tracked> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_revalidation(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .revalidation
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn start_revalidation(&self) {
        let mut slot = self.lock_revalidation();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let period = self.inner.config.revalidate_every;
        let weak = Arc::downgrade(&self.inner);
        debug!(?period, "starting revalidation");
        *slot = Some(tokio::spawn(revalidate_periodically(weak, period)));
    }

    fn stop_revalidation(&self) {
        if let Some(handle) = self.lock_revalidation().take() {
            handle.abort();
        }
    }
}

async fn revalidate_periodically(weak: Weak<Inner>, period: std::time::Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else { break };
        let manager = SessionManager { inner };
        if !manager.is_authenticated() {
            break;
        }
        debug!("periodic revalidation");
        if !manager.check_auth().await {
            break;
        }
    }
}
