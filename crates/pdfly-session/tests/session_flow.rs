//! Session lifecycle against an in-process backend

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use pdfly_session::token::decode_unverified;
use pdfly_session::{
    AuthBackend, AuthState, ClientConfig, CookieAttributes, CredentialStore, MemoryCookieJar,
    SessionError, SessionEvent, SessionManager,
};
use pdfly_types::{
    LoginRequest, LoginResponse, SignupRequest, SignupResponse, TokenClaims, UserProfile,
    VerifyTokenResponse,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "hunter22";

fn claims(exp: u64) -> TokenClaims {
    TokenClaims {
        sub: "user-1".into(),
        email: EMAIL.into(),
        username: "alice".into(),
        exp,
    }
}

fn fake_token(claims: &TokenClaims) -> String {
    let payload = serde_json::to_vec(claims).unwrap();
    format!("e30.{}.c2ln", URL_SAFE_NO_PAD.encode(payload))
}

#[derive(Default)]
struct FakeBackend {
    issued: AtomicU64,
    revoked: Mutex<HashSet<String>>,
    accounts: Mutex<HashSet<String>>,
    verify_calls: AtomicUsize,
    entered: Notify,
    gate: Mutex<Option<Arc<Notify>>>,
    login_entered: Notify,
    login_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    fn hold_verifications(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn hold_logins(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, SessionError> {
        self.login_entered.notify_one();
        let gate = self.login_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if request.email != EMAIL || request.password != PASSWORD {
            return Err(SessionError::AuthFailure("Invalid login credentials".into()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let claims = claims(4_000_000_000 + n);
        Ok(LoginResponse {
            token: fake_token(&claims),
            profile: Some(UserProfile {
                id: claims.sub.clone(),
                email: claims.email.clone(),
                username: claims.username.clone(),
                created_at: None,
            }),
            user_id: claims.sub,
            user_email: claims.email,
        })
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, SessionError> {
        if !self.accounts.lock().unwrap().insert(request.email.clone()) {
            return Err(SessionError::AuthFailure("User already registered".into()));
        }
        Ok(SignupResponse {
            user_id: format!("user-{}", request.username),
        })
    }

    async fn verify(&self, token: &str) -> Result<VerifyTokenResponse, SessionError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.revoked.lock().unwrap().contains(token) {
            return Ok(VerifyTokenResponse::invalid("Token expired"));
        }
        Ok(match decode_unverified(token) {
            Ok(claims) => VerifyTokenResponse::valid(claims),
            Err(e) => VerifyTokenResponse::invalid(e.to_string()),
        })
    }
}

struct Harness {
    backend: Arc<FakeBackend>,
    store: Arc<MemoryCookieJar>,
    manager: SessionManager,
}

fn harness() -> Harness {
    let backend = Arc::new(FakeBackend::default());
    let store = Arc::new(MemoryCookieJar::new(CookieAttributes::default()));
    let config = ClientConfig {
        base_url: "http://auth.test".into(),
        public_key: "pk_test".into(),
        revalidate_every: Duration::from_secs(5 * 60),
        production: false,
    };
    let manager = SessionManager::new(backend.clone(), store.clone(), config);
    Harness {
        backend,
        store,
        manager,
    }
}

#[tokio::test]
async fn test_initial_state_is_verifying() {
    let h = harness();
    assert_eq!(h.manager.session().state, AuthState::Verifying);
    assert!(h.manager.is_loading());
}

#[tokio::test]
async fn test_login_then_logout() {
    let h = harness();
    let mut events = h.manager.subscribe();

    assert!(h.manager.login(EMAIL, PASSWORD).await);
    assert!(h.manager.is_authenticated());

    let stored = h.store.get().unwrap().expect("credential stored");
    let user = h.manager.session().user.unwrap();
    assert_eq!(decode_unverified(&stored).unwrap().sub, user.id);
    assert_eq!(user.username, "alice");
    assert!(h.store.last_set_cookie().unwrap().starts_with("token=e30."));

    h.manager.logout();
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.store.get().unwrap(), None);

    h.manager.logout();
    assert_eq!(h.manager.session().state, AuthState::Unauthenticated);

    assert!(matches!(events.recv().await.unwrap(), SessionEvent::LoggedIn(_)));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_login_leaves_store_untouched() {
    let h = harness();
    h.store.set("previous").unwrap();

    assert!(!h.manager.login(EMAIL, "wrong").await);
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.store.get().unwrap().as_deref(), Some("previous"));
}

#[tokio::test]
async fn test_failed_login_from_signed_out_stays_signed_out() {
    let h = harness();
    assert!(!h.manager.check_auth().await);

    assert!(!h.manager.login("bob@example.com", PASSWORD).await);
    assert_eq!(h.manager.session().state, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_check_auth_without_credential_skips_backend() {
    let h = harness();
    assert!(!h.manager.check_auth().await);
    assert_eq!(h.backend.verify_calls(), 0);
    assert_eq!(h.manager.session().state, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_start_restores_persisted_credential() {
    let h = harness();
    h.store.set(&fake_token(&claims(4_000_000_000))).unwrap();

    assert!(h.manager.start().await);
    assert!(h.manager.is_authenticated());
    assert_eq!(h.manager.session().user.unwrap().email, EMAIL);
    assert_eq!(h.backend.verify_calls(), 1);
}

#[tokio::test]
async fn test_rejected_credential_is_discarded() {
    let h = harness();
    let token = fake_token(&claims(4_000_000_000));
    h.store.set(&token).unwrap();
    h.backend.revoke(&token);
    let mut events = h.manager.subscribe();

    assert!(!h.manager.start().await);
    assert_eq!(h.manager.session().state, AuthState::Unauthenticated);
    assert_eq!(h.store.get().unwrap(), None);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired);
}

#[tokio::test]
async fn test_verify_token_does_not_touch_session() {
    let h = harness();
    assert!(!h.manager.check_auth().await);

    let token = fake_token(&claims(4_000_000_000));
    assert!(h.manager.verify_token(Some(&token)).await);
    assert!(!h.manager.verify_token(None).await);
    assert_eq!(h.manager.session().state, AuthState::Unauthenticated);
    assert_eq!(h.store.get().unwrap(), None);
}

#[tokio::test]
async fn test_login_beats_older_inflight_verification() {
    let h = harness();
    let stale = fake_token(&claims(1));
    h.store.set(&stale).unwrap();
    h.backend.revoke(&stale);
    let gate = h.backend.hold_verifications();

    let checker = h.manager.clone();
    let pending = tokio::spawn(async move { checker.check_auth().await });
    h.backend.entered.notified().await;

    assert!(h.manager.login(EMAIL, PASSWORD).await);
    gate.notify_one();
    assert!(!pending.await.unwrap());

    // The rejection of the old credential arrived last but was discarded
    assert!(h.manager.is_authenticated());
    let stored = h.store.get().unwrap().expect("new credential kept");
    assert_ne!(stored, stale);
}

#[tokio::test]
async fn test_older_verification_finishing_during_login_does_not_block_it() {
    let h = harness();
    let stale = fake_token(&claims(1));
    h.store.set(&stale).unwrap();
    h.backend.revoke(&stale);
    let verify_gate = h.backend.hold_verifications();
    let login_gate = h.backend.hold_logins();
    let mut events = h.manager.subscribe();

    let checker = h.manager.clone();
    let checking = tokio::spawn(async move { checker.check_auth().await });
    h.backend.entered.notified().await;

    let user = h.manager.clone();
    let logging_in = tokio::spawn(async move { user.login(EMAIL, PASSWORD).await });
    h.backend.login_entered.notified().await;

    // The rejection lands first and clears the old credential
    verify_gate.notify_one();
    assert!(!checking.await.unwrap());
    assert_eq!(h.store.get().unwrap(), None);

    login_gate.notify_one();
    assert!(logging_in.await.unwrap());

    assert!(h.manager.is_authenticated());
    let stored = h.store.get().unwrap().expect("new credential stored");
    assert_ne!(stored, stale);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    assert!(matches!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedIn(_)
    ));
}

#[tokio::test]
async fn test_verification_started_after_login_applies() {
    let h = harness();
    assert!(h.manager.login(EMAIL, PASSWORD).await);
    let token = h.store.get().unwrap().unwrap();
    h.backend.revoke(&token);

    assert!(!h.manager.check_auth().await);
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.store.get().unwrap(), None);
}

#[tokio::test]
async fn test_register_does_not_sign_in() {
    let h = harness();
    assert!(h.manager.register("alice", "new@example.com", PASSWORD).await);
    assert!(!h.manager.register("alice", "new@example.com", PASSWORD).await);
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.store.get().unwrap(), None);
}

#[tokio::test]
async fn test_authorization_header() {
    let h = harness();
    assert_eq!(h.manager.authorization_header().await, "Bearer pk_test");

    assert!(h.manager.login(EMAIL, PASSWORD).await);
    let token = h.store.get().unwrap().unwrap();
    assert_eq!(
        h.manager.authorization_header().await,
        format!("Bearer {}", token)
    );

    h.backend.revoke(&token);
    assert_eq!(h.manager.authorization_header().await, "Bearer pk_test");
    assert!(!h.manager.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_periodic_revalidation_expires_session() {
    let h = harness();
    assert!(h.manager.login(EMAIL, PASSWORD).await);
    let token = h.store.get().unwrap().unwrap();
    let mut events = h.manager.subscribe();

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(h.backend.verify_calls(), 0);

    h.backend.revoke(&token);
    let event = tokio::time::timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("revalidation ran")
        .unwrap();

    assert_eq!(event, SessionEvent::Expired);
    assert_eq!(h.backend.verify_calls(), 1);
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.store.get().unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_logout_stops_revalidation() {
    let h = harness();
    assert!(h.manager.login(EMAIL, PASSWORD).await);
    h.manager.logout();

    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    assert_eq!(h.backend.verify_calls(), 0);
}
