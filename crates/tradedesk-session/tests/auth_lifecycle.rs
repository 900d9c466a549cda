//! Integration tests for `AuthController`.
//!
//! A scripted `MockBackend` stands in for the API: each test queues the
//! responses it wants, and the mock records how often it was called and
//! which bearer header each call saw. Storage is a `MemoryStore` with a
//! `ManualClock`, so expiry is deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::Notify;
use tradedesk_protocol::{AuthResponse, Credentials, Registration, Role, UserId, UserProfile};
use tradedesk_session::{AuthController, AuthPhase, SessionConfig, SessionError};
use tradedesk_store::{KeyValueStore, ManualClock, MemoryStore, SessionStore, StoreConfig};
use tradedesk_transport::{AuthBackend, AuthHeader, ErrorKind, FailedCall};

const START: u64 = 1_700_000_000_000;

// =========================================================================
// Mock backend
// =========================================================================

#[derive(Default)]
struct Script {
    login: VecDeque<Result<AuthResponse, FailedCall>>,
    register: VecDeque<Result<AuthResponse, FailedCall>>,
    profile: VecDeque<Result<UserProfile, FailedCall>>,
    /// When set, login waits for a permit before answering.
    login_gate: Option<Arc<Notify>>,
    profile_calls: usize,
    login_calls: usize,
    /// Bearer header value at the time of each profile call.
    profile_headers: Vec<Option<String>>,
}

#[derive(Clone)]
struct MockBackend {
    header: AuthHeader,
    script: Arc<Mutex<Script>>,
}

impl MockBackend {
    fn new(header: AuthHeader) -> Self {
        Self {
            header,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    fn on_login(&self, result: Result<AuthResponse, FailedCall>) {
        self.script.lock().unwrap().login.push_back(result);
    }

    fn on_register(&self, result: Result<AuthResponse, FailedCall>) {
        self.script.lock().unwrap().register.push_back(result);
    }

    fn gate_login(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().unwrap().login_gate = Some(Arc::clone(&gate));
        gate
    }

    fn on_profile(&self, result: Result<UserProfile, FailedCall>) {
        self.script.lock().unwrap().profile.push_back(result);
    }

    fn profile_calls(&self) -> usize {
        self.script.lock().unwrap().profile_calls
    }

    fn profile_headers(&self) -> Vec<Option<String>> {
        self.script.lock().unwrap().profile_headers.clone()
    }
}

fn unscripted() -> FailedCall {
    FailedCall::network("ERR_NETWORK", "no scripted response")
}

impl AuthBackend for MockBackend {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, FailedCall> {
        let gate = self.script.lock().unwrap().login_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut script = self.script.lock().unwrap();
        script.login_calls += 1;
        script.login.pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    async fn register(&self, _registration: &Registration) -> Result<AuthResponse, FailedCall> {
        let mut script = self.script.lock().unwrap();
        script.register.pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    async fn profile(&self) -> Result<UserProfile, FailedCall> {
        let mut script = self.script.lock().unwrap();
        script.profile_calls += 1;
        script.profile_headers.push(self.header.value());
        script.profile.pop_front().unwrap_or_else(|| Err(unscripted()))
    }
}

// =========================================================================
// Fixture
// =========================================================================

struct Fixture {
    controller: AuthController<MockBackend>,
    backend: MockBackend,
    store: SessionStore,
    header: AuthHeader,
    clock: ManualClock,
    kv: Arc<MemoryStore>,
}

fn fixture_with(config: SessionConfig) -> Fixture {
    let clock = ManualClock::new(START);
    let kv = Arc::new(MemoryStore::new());
    let store = SessionStore::with_clock(kv.clone(), Arc::new(clock.clone()), StoreConfig::default());
    let header = AuthHeader::new();
    let backend = MockBackend::new(header.clone());
    let controller = AuthController::new(backend.clone(), store.clone(), header.clone(), config);
    Fixture {
        controller,
        backend,
        store,
        header,
        clock,
        kv,
    }
}

fn fixture() -> Fixture {
    fixture_with(SessionConfig::default())
}

fn admin() -> UserProfile {
    UserProfile::new(UserId::from("u-1"), "ops@tradedesk.io", Role::Admin)
}

fn auth_response(token: &str, expires_in: Option<u64>) -> AuthResponse {
    AuthResponse {
        token: token.into(),
        expires_in,
        user: admin(),
    }
}

fn creds() -> Credentials {
    Credentials::new("ops@tradedesk.io", "pw")
}

// =========================================================================
// Startup recovery
// =========================================================================

#[tokio::test]
async fn test_startup_empty_store_settles_unauthenticated() {
    let f = fixture();

    let phase = f.controller.startup().await;

    assert_eq!(phase, AuthPhase::Unauthenticated);
    assert_eq!(f.controller.state().phase, AuthPhase::Unauthenticated);
    assert!(!f.controller.state().is_loading());
    assert_eq!(f.backend.profile_calls(), 0);
    assert!(!f.header.is_set());
}

#[tokio::test]
async fn test_startup_cached_session_trusted_without_network() {
    // Scenario A: token + cached user, backend unreachable.
    let f = fixture();
    f.store.set_token("t-1", Some(3_600)).unwrap();
    f.store.set_user(&admin()).unwrap();
    f.backend.on_profile(Err(FailedCall::network("ECONNREFUSED", "down")));

    let phase = f.controller.startup().await;

    assert_eq!(phase, AuthPhase::Authenticated);
    assert_eq!(f.backend.profile_calls(), 0);
    let state = f.controller.state();
    assert_eq!(state.user, Some(admin()));
    assert_eq!(state.token.as_deref(), Some("t-1"));
    assert_eq!(f.header.value().as_deref(), Some("Bearer t-1"));
}

#[tokio::test]
async fn test_startup_token_only_401_clears_session() {
    // Scenario B: token, no cached user, profile says 401.
    let f = fixture();
    f.store.set_token("t-1", Some(3_600)).unwrap();
    f.backend.on_profile(Err(FailedCall::status(401, Some(json!({ "message": "jwt expired" })))));

    let phase = f.controller.startup().await;

    assert_eq!(phase, AuthPhase::Unauthenticated);
    assert_eq!(f.store.token(), None);
    assert!(f.kv.is_empty());
    assert!(!f.header.is_set());
    assert_eq!(f.controller.state().token, None);
}

#[tokio::test]
async fn test_startup_token_only_403_clears_session() {
    let f = fixture();
    f.store.set_token("t-1", None).unwrap();
    f.backend.on_profile(Err(FailedCall::status(403, None)));

    assert_eq!(f.controller.startup().await, AuthPhase::Unauthenticated);
    assert!(f.kv.is_empty());
}

#[tokio::test]
async fn test_startup_token_only_network_failure_keeps_session() {
    // Scenario C: token, no cached user, backend unreachable.
    let f = fixture();
    f.store.set_token("t-1", Some(3_600)).unwrap();
    f.backend.on_profile(Err(FailedCall::network("ECONNREFUSED", "down")));

    let phase = f.controller.startup().await;

    assert_eq!(phase, AuthPhase::Authenticated);
    assert_eq!(f.store.token().as_deref(), Some("t-1"));
    assert_eq!(f.store.expires_at(), Some(START + 3_600_000));
    assert_eq!(f.store.user(), None);
    let state = f.controller.state();
    assert!(state.is_authenticated());
    assert_eq!(state.user, None);
}

#[tokio::test]
async fn test_startup_token_only_server_error_keeps_session() {
    let f = fixture();
    f.store.set_token("t-1", None).unwrap();
    f.backend.on_profile(Err(FailedCall::status(500, None)));

    assert_eq!(f.controller.startup().await, AuthPhase::Authenticated);
    assert_eq!(f.store.token().as_deref(), Some("t-1"));
}

#[tokio::test]
async fn test_startup_token_only_profile_success_caches_user() {
    let f = fixture();
    f.store.set_token("t-1", None).unwrap();
    f.backend.on_profile(Ok(admin()));

    let phase = f.controller.startup().await;

    assert_eq!(phase, AuthPhase::Authenticated);
    assert_eq!(f.store.user(), Some(admin()));
    assert_eq!(f.controller.state().user, Some(admin()));
    // The profile call went out with the stored token.
    assert_eq!(f.backend.profile_headers(), vec![Some("Bearer t-1".to_string())]);
}

#[tokio::test]
async fn test_startup_user_without_token_clears_session() {
    let f = fixture();
    f.store.set_user(&admin()).unwrap();

    assert_eq!(f.controller.startup().await, AuthPhase::Unauthenticated);
    assert_eq!(f.store.user(), None);
}

#[tokio::test]
async fn test_startup_expired_cached_session_adopted_by_default() {
    let f = fixture();
    f.store.set_token("t-1", Some(60)).unwrap();
    f.store.set_user(&admin()).unwrap();
    f.clock.advance(Duration::from_secs(120));
    assert!(!f.store.has_valid_token());

    assert_eq!(f.controller.startup().await, AuthPhase::Authenticated);
    assert_eq!(f.backend.profile_calls(), 0);
    assert_eq!(f.store.token().as_deref(), Some("t-1"));
}

#[tokio::test]
async fn test_startup_expired_session_cleared_with_strict_expiry() {
    let f = fixture_with(SessionConfig { strict_expiry: true });
    f.store.set_token("t-1", Some(60)).unwrap();
    f.store.set_user(&admin()).unwrap();
    f.clock.advance(Duration::from_secs(120));

    assert_eq!(f.controller.startup().await, AuthPhase::Unauthenticated);
    assert!(f.kv.is_empty());
}

#[tokio::test]
async fn test_startup_runs_once() {
    let f = fixture();
    f.store.set_token("t-1", None).unwrap();
    f.backend.on_profile(Ok(admin()));
    assert_eq!(f.controller.startup().await, AuthPhase::Authenticated);

    f.controller.logout();
    f.store.set_token("t-2", None).unwrap();
    let again = f.controller.startup().await;

    assert_eq!(again, AuthPhase::Unauthenticated);
    assert_eq!(f.backend.profile_calls(), 1);
}

#[tokio::test]
async fn test_wait_until_settled_resolves_after_startup() {
    let f = Arc::new(fixture());
    f.store.set_token("t-1", None).unwrap();
    f.store.set_user(&admin()).unwrap();

    let waiter = {
        let f = Arc::clone(&f);
        tokio::spawn(async move { f.controller.wait_until_settled().await })
    };
    tokio::task::yield_now().await;
    f.controller.startup().await;

    let state = waiter.await.unwrap();
    assert_eq!(state.phase, AuthPhase::Authenticated);
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_success_persists_session() {
    let f = fixture();
    f.controller.startup().await;
    f.backend.on_login(Ok(auth_response("t-new", Some(3_600))));

    let user = f.controller.login(&creds()).await.expect("login should succeed");

    assert_eq!(user, admin());
    assert_eq!(f.store.token().as_deref(), Some("t-new"));
    assert_eq!(f.store.expires_at(), Some(START + 3_600_000));
    assert_eq!(f.store.user(), Some(admin()));
    assert_eq!(f.header.value().as_deref(), Some("Bearer t-new"));

    let state = f.controller.state();
    assert_eq!(state.phase, AuthPhase::Authenticated);
    assert_eq!(state.user, Some(admin()));
    assert!(!state.busy);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_login_without_expiry_stores_non_expiring_token() {
    let f = fixture();
    f.backend.on_login(Ok(auth_response("t-new", None)));

    f.controller.login(&creds()).await.unwrap();
    f.clock.advance(Duration::from_secs(365 * 86_400));

    assert!(f.store.has_valid_token());
    assert_eq!(f.store.time_until_expiry(), None);
}

#[tokio::test]
async fn test_login_failure_leaves_store_and_reports_message() {
    let f = fixture();
    f.controller.startup().await;
    f.backend.on_login(Err(FailedCall::status(
        400,
        Some(json!({ "message": "Invalid email or password" })),
    )));

    let err = f.controller.login(&creds()).await.expect_err("login should fail");

    assert!(matches!(err, SessionError::Api(ref e) if e.kind == ErrorKind::Client));
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(f.kv.is_empty());
    assert!(!f.header.is_set());

    let state = f.controller.state();
    assert_eq!(state.phase, AuthPhase::Unauthenticated);
    assert_eq!(state.error.as_deref(), Some("Invalid email or password"));
    assert!(!state.busy);
}

#[tokio::test]
async fn test_login_failure_keeps_existing_session_untouched() {
    let f = fixture();
    f.store.set_token("t-old", Some(600)).unwrap();
    f.store.set_user(&admin()).unwrap();
    f.controller.startup().await;
    f.backend.on_login(Err(FailedCall::status(401, None)));

    assert!(f.controller.login(&creds()).await.is_err());

    assert_eq!(f.store.token().as_deref(), Some("t-old"));
    assert_eq!(f.store.user(), Some(admin()));
    assert_eq!(f.header.value().as_deref(), Some("Bearer t-old"));
}

#[tokio::test]
async fn test_login_401_reports_backend_message() {
    let f = fixture();
    f.controller.startup().await;
    f.backend.on_login(Err(FailedCall::status(
        401,
        Some(json!({ "message": "Invalid credentials" })),
    )));

    let err = f.controller.login(&creds()).await.expect_err("login should fail");

    assert!(matches!(err, SessionError::Api(ref e) if e.kind == ErrorKind::Auth));
    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(f.controller.state().error.as_deref(), Some("Invalid credentials"));
    assert!(f.kv.is_empty());
}

#[tokio::test]
async fn test_login_raises_busy_while_in_flight() {
    let f = fixture();
    f.controller.startup().await;
    f.backend.on_login(Ok(auth_response("t-1", None)));
    let gate = f.backend.gate_login();
    let mut rx = f.controller.subscribe();
    let creds = creds();

    let (result, ()) = tokio::join!(f.controller.login(&creds), async {
        rx.wait_for(|s| s.busy).await.unwrap();
        let state = f.controller.state();
        assert!(state.busy);
        assert_eq!(state.phase, AuthPhase::Unauthenticated);
        gate.notify_one();
    });

    result.unwrap();
    let state = f.controller.state();
    assert!(!state.busy);
    assert_eq!(state.phase, AuthPhase::Authenticated);
}

#[tokio::test]
async fn test_clear_error_dismisses_message() {
    let f = fixture();
    f.backend.on_login(Err(FailedCall::status(400, None)));
    let _ = f.controller.login(&creds()).await;
    assert!(f.controller.state().error.is_some());

    f.controller.clear_error();

    assert_eq!(f.controller.state().error, None);
}

// =========================================================================
// Register
// =========================================================================

#[tokio::test]
async fn test_register_success_signs_in() {
    let f = fixture();
    f.controller.startup().await;
    f.backend.on_register(Ok(auth_response("t-reg", Some(60))));
    let registration = Registration {
        email: "new@tradedesk.io".into(),
        password: "pw".into(),
        username: Some("new".into()),
        wallet_address: None,
    };

    f.controller.register(&registration).await.unwrap();

    assert_eq!(f.controller.state().phase, AuthPhase::Authenticated);
    assert_eq!(f.store.token().as_deref(), Some("t-reg"));
}

#[tokio::test]
async fn test_register_never_raises_busy() {
    let f = fixture();
    f.controller.startup().await;
    f.backend.on_register(Err(FailedCall::status(409, Some(json!({ "error": "email taken" })))));
    let mut rx = f.controller.subscribe();
    let _ = rx.borrow_and_update();

    let err = f
        .controller
        .register(&Registration {
            email: "dup@tradedesk.io".into(),
            password: "pw".into(),
            username: None,
            wallet_address: None,
        })
        .await
        .expect_err("should fail");

    assert_eq!(err.to_string(), "email taken");
    // Only the error was published; busy never flipped.
    let state = rx.borrow_and_update().clone();
    assert!(!state.busy);
    assert!(!state.is_loading());
    assert!(f.kv.is_empty());
}

// =========================================================================
// Refresh
// =========================================================================

#[tokio::test]
async fn test_refresh_without_valid_token_is_noop_false() {
    let f = fixture();
    f.controller.startup().await;

    assert!(!f.controller.refresh_token().await.unwrap());
    assert_eq!(f.backend.profile_calls(), 0);
}

#[tokio::test]
async fn test_refresh_with_expired_token_is_noop_false() {
    let f = fixture();
    f.backend.on_login(Ok(auth_response("t-1", Some(60))));
    f.controller.login(&creds()).await.unwrap();
    f.clock.advance(Duration::from_secs(61));

    assert!(!f.controller.refresh_token().await.unwrap());
    assert_eq!(f.backend.profile_calls(), 0);
}

#[tokio::test]
async fn test_refresh_success_updates_cached_user() {
    let f = fixture();
    f.backend.on_login(Ok(auth_response("t-1", Some(3_600))));
    f.controller.login(&creds()).await.unwrap();
    let mut updated = admin();
    updated.balance = Some(99.5);
    f.backend.on_profile(Ok(updated.clone()));

    assert!(f.controller.refresh_token().await.unwrap());

    assert_eq!(f.store.user(), Some(updated.clone()));
    assert_eq!(f.controller.state().user, Some(updated));
    assert!(!f.controller.state().busy);
    assert_eq!(f.backend.profile_headers(), vec![Some("Bearer t-1".to_string())]);
}

#[tokio::test]
async fn test_refresh_network_failure_clears_session() {
    // Refresh is conservative: unlike startup, any failure signs out.
    let f = fixture();
    f.backend.on_login(Ok(auth_response("t-1", Some(3_600))));
    f.controller.login(&creds()).await.unwrap();
    f.backend.on_profile(Err(FailedCall::network("ETIMEDOUT", "timeout")));

    assert!(!f.controller.refresh_token().await.unwrap());

    assert!(f.kv.is_empty());
    assert!(!f.header.is_set());
    assert_eq!(f.controller.state().phase, AuthPhase::Unauthenticated);
}

// =========================================================================
// Logout / update_user
// =========================================================================

#[tokio::test]
async fn test_logout_clears_everything_and_is_idempotent() {
    let f = fixture();
    f.backend.on_login(Ok(auth_response("t-1", Some(3_600))));
    f.controller.login(&creds()).await.unwrap();

    f.controller.logout();
    f.controller.logout();

    assert!(f.kv.is_empty());
    assert!(!f.header.is_set());
    let state = f.controller.state();
    assert_eq!(state.phase, AuthPhase::Unauthenticated);
    assert_eq!(state.user, None);
    assert_eq!(state.token, None);
}

#[tokio::test]
async fn test_update_user_requires_sign_in() {
    let f = fixture();
    f.controller.startup().await;

    let result = f.controller.update_user(admin());

    assert!(matches!(result, Err(SessionError::NotAuthenticated)));
    assert_eq!(f.store.user(), None);
}

#[tokio::test]
async fn test_update_user_recaches_profile() {
    let f = fixture();
    f.backend.on_login(Ok(auth_response("t-1", None)));
    f.controller.login(&creds()).await.unwrap();
    let mut edited = admin();
    edited.username = Some("desk-ops".into());

    f.controller.update_user(edited.clone()).unwrap();

    assert_eq!(f.store.user(), Some(edited.clone()));
    assert_eq!(f.controller.state().user, Some(edited));
}

#[tokio::test]
async fn test_store_and_header_stay_in_sync_across_transitions() {
    let f = fixture();
    let in_sync = |f: &Fixture| f.store.token() == f.header.token();

    f.controller.startup().await;
    assert!(in_sync(&f));

    f.backend.on_login(Ok(auth_response("t-1", Some(3_600))));
    f.controller.login(&creds()).await.unwrap();
    assert!(in_sync(&f));

    f.backend.on_profile(Err(FailedCall::status(401, None)));
    f.controller.refresh_token().await.unwrap();
    assert!(in_sync(&f));

    f.backend.on_login(Ok(auth_response("t-2", None)));
    f.controller.login(&creds()).await.unwrap();
    f.controller.logout();
    assert!(in_sync(&f));
    assert_eq!(f.kv.get("auth_token").unwrap(), None);
}
