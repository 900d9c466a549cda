//! Route access decisions.
//!
//! The guard never mutates anything. It reads the controller's published
//! [`AuthState`] and, as a fallback, the session store, and answers one
//! question per navigation: render, wait, or redirect.
//!
//! The store fallback matters on a fresh launch: the cached profile and a
//! valid token are enough to render a protected route before startup
//! recovery has even begun.

use std::sync::Arc;

use tradedesk_session::{AuthController, AuthPhase, AuthState};
use tradedesk_store::SessionStore;
use tradedesk_transport::AuthBackend;

use crate::config::is_local_path;
use crate::{GuardConfig, GuardDecision};

/// What the guard knows about the stored session at decision time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StoredSession {
    pub has_user: bool,
    pub has_valid_token: bool,
}

impl StoredSession {
    pub(crate) fn read(store: &SessionStore) -> Self {
        Self {
            has_user: store.user().is_some(),
            has_valid_token: store.has_valid_token(),
        }
    }

    fn is_usable(&self) -> bool {
        self.has_user && self.has_valid_token
    }
}

/// Decides whether a route may render.
///
/// Cheap to clone; clones share the controller.
pub struct RouteGuard<B: AuthBackend> {
    controller: Arc<AuthController<B>>,
    config: GuardConfig,
}

impl<B: AuthBackend> Clone for RouteGuard<B> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            config: self.config.clone(),
        }
    }
}

impl<B: AuthBackend> RouteGuard<B> {
    pub fn new(controller: Arc<AuthController<B>>, config: GuardConfig) -> Self {
        Self { controller, config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decision for a route that requires a signed-in user.
    pub fn protected(&self, location: &str) -> GuardDecision {
        let state = self.controller.state();
        let stored = StoredSession::read(self.controller.store());
        let decision = protected_decision(&self.config, &state, stored, location);
        tracing::debug!(location, phase = %state.phase, %decision, "protected route");
        decision
    }

    /// Decision for a route only signed-out visitors should see, such as
    /// the sign-in page. `remembered` is where the visitor was headed
    /// before being sent to sign in. Anything but a local path there, or
    /// the sign-in page itself, sends the visitor to the landing path.
    pub fn public_only(&self, location: &str, remembered: Option<&str>) -> GuardDecision {
        let state = self.controller.state();
        let decision = public_only_decision(&self.config, &state, remembered);
        tracing::debug!(location, phase = %state.phase, %decision, "public-only route");
        decision
    }

    /// Like [`protected`](Self::protected), but waits for startup recovery
    /// to settle first, so the answer is never `Loading` on account of an
    /// unsettled phase.
    pub async fn protected_when_settled(&self, location: &str) -> GuardDecision {
        self.controller.wait_until_settled().await;
        self.protected(location)
    }
}

// =========================================================================
// Decision rules
// =========================================================================

pub(crate) fn protected_decision(
    config: &GuardConfig,
    state: &AuthState,
    stored: StoredSession,
    location: &str,
) -> GuardDecision {
    if state.user.is_some() || stored.is_usable() || state.is_authenticated() {
        return GuardDecision::Render;
    }
    if is_initializing(state.phase) {
        return GuardDecision::Loading;
    }
    GuardDecision::Redirect {
        to: config.sign_in_path.clone(),
        from: Some(location.to_string()),
    }
}

pub(crate) fn public_only_decision(
    config: &GuardConfig,
    state: &AuthState,
    remembered: Option<&str>,
) -> GuardDecision {
    if is_initializing(state.phase) {
        return GuardDecision::Loading;
    }
    if !state.is_authenticated() {
        return GuardDecision::Render;
    }
    let to = match remembered {
        Some(path) if is_local_path(path) && !config.is_sign_in(path) => path.to_string(),
        _ => config.landing_path.clone(),
    };
    GuardDecision::Redirect { to, from: None }
}

// `busy` doesn't count: a login in flight keeps the sign-in form up.
fn is_initializing(phase: AuthPhase) -> bool {
    matches!(phase, AuthPhase::Uninitialized | AuthPhase::Initializing)
}
