//! The auth controller: the single owner of session state.
//!
//! It's responsible for:
//! - Recovering a stored session at startup, without blocking on the
//!   network when the cached data is enough
//! - Signing in, registering, refreshing, and signing out
//! - Keeping three copies of the token in agreement: the session store,
//!   the in-memory [`AuthState`], and the outgoing [`AuthHeader`]
//!
//! # Concurrency note
//!
//! Every method takes `&self`, so one controller is shared behind an `Arc`
//! by the views, the route guard, and the refresh task. State changes go
//! through a `watch` channel; store and header writes are synchronous and
//! never held across an `.await`. Login and logout may race; whichever
//! writes last wins.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tradedesk_protocol::{AuthResponse, Credentials, Registration, UserProfile};
use tradedesk_store::{SessionStore, StoreError};
use tradedesk_transport::{AuthBackend, AuthHeader, FailedCall, classify};

use crate::{AuthPhase, AuthState, SessionConfig, SessionError};

/// A change to the bearer token. Applied only by
/// [`AuthController::apply_token`].
enum TokenChange<'a> {
    /// A fresh token from the backend: persist it, then install it.
    Establish {
        token: &'a str,
        expires_in: Option<u64>,
    },
    /// A token already in the store (startup recovery): install it.
    Adopt(&'a str),
    /// Forget the token everywhere.
    Clear,
}

/// Drives the session lifecycle.
///
/// ## Lifecycle
///
/// ```text
///              startup()
///                  │
///        ┌─────────┴──────────┐
///        ▼                    ▼
/// [Authenticated] ◀──login()── [Unauthenticated]
///        │        ◀─register()─       ▲
///        ├──refresh_token() ok        │
///        └──logout() / refresh fails──┘
/// ```
pub struct AuthController<B: AuthBackend> {
    backend: B,
    store: SessionStore,
    header: AuthHeader,
    config: SessionConfig,
    state: watch::Sender<AuthState>,
    started: AtomicBool,
}

impl<B: AuthBackend> AuthController<B> {
    /// Creates a controller in [`AuthPhase::Uninitialized`].
    ///
    /// `header` should be the same [`AuthHeader`] the backend reads from.
    pub fn new(
        backend: B,
        store: SessionStore,
        header: AuthHeader,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            backend,
            store,
            header,
            config,
            state,
            started: AtomicBool::new(false),
        }
    }

    /// The current in-memory state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// A receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn header(&self) -> &AuthHeader {
        &self.header
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolves once startup recovery has settled.
    pub async fn wait_until_settled(&self) -> AuthState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.phase.is_settled()).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so this can't happen while we
            // are borrowed; fall back to whatever is current.
            Err(_) => self.state(),
        }
    }

    // =====================================================================
    // Startup recovery
    // =====================================================================

    /// Recovers the stored session. Runs at most once per controller;
    /// later calls return the current phase without doing anything.
    ///
    /// Always settles: storage failures along the way are logged, never
    /// returned, so the guard can't be left waiting.
    pub async fn startup(&self) -> AuthPhase {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("startup recovery already ran");
            return self.state.borrow().phase;
        }

        self.state.send_modify(|s| s.phase = AuthPhase::Initializing);

        let token = self.store.token();
        let cached_user = self.store.user();

        let Some(token) = token else {
            if cached_user.is_some() {
                tracing::warn!("cached profile without a token, clearing session");
            }
            self.reset("no stored session");
            return AuthPhase::Unauthenticated;
        };

        if self.config.strict_expiry && self.store.is_expired() {
            self.reset("stored token expired");
            return AuthPhase::Unauthenticated;
        }

        self.apply_token(TokenChange::Adopt(&token)).ok();

        if let Some(user) = cached_user {
            tracing::info!(
                user_id = %user.id,
                expired = self.store.is_expired(),
                "restored cached session"
            );
            self.settle_authenticated(token, Some(user));
            return AuthPhase::Authenticated;
        }

        match self.backend.profile().await {
            Ok(user) => {
                if let Err(e) = self.store.set_user(&user) {
                    tracing::warn!(error = %e, "could not cache recovered profile");
                }
                tracing::info!(user_id = %user.id, "session recovered from backend");
                self.settle_authenticated(token, Some(user));
                AuthPhase::Authenticated
            }
            Err(failed) => {
                let err = classify(&failed);
                if err.is_auth {
                    tracing::info!(status = ?err.status, "stored token rejected");
                    self.reset("stored token rejected");
                    return AuthPhase::Unauthenticated;
                }
                if err.is_network {
                    tracing::info!("backend unreachable, keeping stored session");
                } else {
                    tracing::warn!(
                        kind = %err.kind,
                        status = ?err.status,
                        error = %err,
                        "profile check failed, keeping stored session"
                    );
                }
                self.settle_authenticated(token, None);
                AuthPhase::Authenticated
            }
        }
    }

    // =====================================================================
    // Sign-in
    // =====================================================================

    /// Signs in with `credentials`.
    ///
    /// Raises `busy` for the duration of the call. On success the token,
    /// expiry, and profile are persisted and the state settles
    /// `Authenticated`. On failure the store is left untouched and the
    /// classified message is recorded in [`AuthState::error`].
    ///
    /// # Errors
    /// - [`SessionError::Api`] if the backend refused or failed
    /// - [`SessionError::Store`] if the new session couldn't be persisted
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, SessionError> {
        self.state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });
        let outcome = self.backend.login(credentials).await;
        let result = self.complete_sign_in(outcome, "sign-in");
        self.state.send_modify(|s| s.busy = false);
        result
    }

    /// Registers a new account and signs it in.
    ///
    /// Same contract as [`login`](Self::login), except `busy` is never
    /// raised: a failed registration mustn't hold up route rendering.
    ///
    /// # Errors
    /// Same as [`login`](Self::login).
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, SessionError> {
        self.state.send_modify(|s| s.error = None);
        let outcome = self.backend.register(registration).await;
        self.complete_sign_in(outcome, "registration")
    }

    fn complete_sign_in(
        &self,
        outcome: Result<AuthResponse, FailedCall>,
        action: &'static str,
    ) -> Result<UserProfile, SessionError> {
        let response = match outcome {
            Ok(response) => response,
            Err(failed) => {
                let err = classify(&failed);
                tracing::warn!(
                    action,
                    kind = %err.kind,
                    status = ?err.status,
                    error = %err,
                    "sign-in rejected"
                );
                self.state.send_modify(|s| s.error = Some(err.message.clone()));
                return Err(SessionError::Api(err));
            }
        };

        if let Err(e) = self.persist(&response) {
            tracing::error!(action, error = %e, "could not persist new session");
            // Don't leave a half-written session behind.
            if let Err(clear) = self.apply_token(TokenChange::Clear) {
                tracing::warn!(error = %clear, "cleanup after failed persist also failed");
            }
            self.state.send_modify(|s| s.error = Some(e.to_string()));
            return Err(SessionError::Store(e));
        }

        tracing::info!(action, user_id = %response.user.id, "signed in");
        self.settle_authenticated(response.token, Some(response.user.clone()));
        self.state.send_modify(|s| s.error = None);
        Ok(response.user)
    }

    fn persist(&self, response: &AuthResponse) -> Result<(), StoreError> {
        self.apply_token(TokenChange::Establish {
            token: &response.token,
            expires_in: response.expires_in,
        })?;
        self.store.set_user(&response.user)
    }

    // =====================================================================
    // Refresh / profile
    // =====================================================================

    /// Revalidates the stored token against the profile endpoint.
    ///
    /// Returns `Ok(false)` without a call when there's no valid token.
    /// Any backend failure ends the session and returns `Ok(false)`.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] only if the refreshed profile
    /// couldn't be cached.
    pub async fn refresh_token(&self) -> Result<bool, SessionError> {
        if !self.store.has_valid_token() {
            return Ok(false);
        }

        self.state.send_modify(|s| s.busy = true);
        let outcome = self.backend.profile().await;

        match outcome {
            Ok(user) => {
                let cached = self.store.set_user(&user);
                self.state.send_modify(|s| {
                    s.busy = false;
                    if cached.is_ok() {
                        s.user = Some(user);
                    }
                });
                cached?;
                tracing::debug!("session revalidated");
                Ok(true)
            }
            Err(failed) => {
                let err = classify(&failed);
                tracing::warn!(kind = %err.kind, status = ?err.status, "refresh failed, signing out");
                self.reset("refresh failed");
                Ok(false)
            }
        }
    }

    /// Replaces the cached profile, e.g. after the user edited it.
    ///
    /// # Errors
    /// - [`SessionError::NotAuthenticated`] when nobody is signed in
    /// - [`SessionError::Store`] if the snapshot couldn't be written
    pub fn update_user(&self, user: UserProfile) -> Result<(), SessionError> {
        if !self.state.borrow().is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        self.store.set_user(&user)?;
        self.state.send_modify(|s| s.user = Some(user));
        Ok(())
    }

    /// Dismisses the last sign-in error.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    // =====================================================================
    // Sign-out
    // =====================================================================

    /// Signs out: clears the store, the header, and the in-memory state.
    /// Safe to call any number of times.
    pub fn logout(&self) {
        self.reset("logout");
        tracing::info!("signed out");
    }

    // =====================================================================
    // Internals
    // =====================================================================

    /// The only place the token changes. The header is updated in the
    /// same call as the store so no request can go out with a stale one.
    fn apply_token(&self, change: TokenChange<'_>) -> Result<(), StoreError> {
        match change {
            TokenChange::Establish { token, expires_in } => {
                self.store.set_token(token, expires_in)?;
                self.header.set_bearer(token);
                Ok(())
            }
            TokenChange::Adopt(token) => {
                self.header.set_bearer(token);
                Ok(())
            }
            TokenChange::Clear => {
                // Header first: even if the store write fails, nothing
                // leaves with the old credential.
                self.header.clear();
                self.store.clear_session()
            }
        }
    }

    fn settle_authenticated(&self, token: String, user: Option<UserProfile>) {
        self.state.send_modify(|s| {
            s.phase = AuthPhase::Authenticated;
            s.token = Some(token);
            if user.is_some() {
                s.user = user;
            }
        });
    }

    fn reset(&self, reason: &'static str) {
        if let Err(e) = self.apply_token(TokenChange::Clear) {
            tracing::error!(reason, error = %e, "could not clear stored session");
        }
        self.state.send_replace(AuthState::signed_out());
        tracing::debug!(reason, "session reset");
    }
}
