//! In-memory auth state: what the console currently believes about the
//! signed-in user.
//!
//! This is a volatile mirror of the session store. It's published by the
//! controller through a `tokio::sync::watch` channel, so the route guard
//! and any view can read the latest value or wait for the next one.

use std::fmt;

use tradedesk_protocol::UserProfile;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Controller behavior switches.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Treat a locally expired token as dead during startup recovery.
    ///
    /// Off by default: a stored token and profile are adopted even when the
    /// local clock says the token has expired, and the next backend call
    /// decides. Turning this on clears expired sessions at startup instead.
    pub strict_expiry: bool,
}

// ---------------------------------------------------------------------------
// AuthPhase
// ---------------------------------------------------------------------------

/// Where the controller is in its lifecycle.
///
/// ```text
/// Uninitialized ──(startup)──→ Initializing ──→ Authenticated
///                                   │               ↑    │
///                                   ↓       (login) │    │ (logout / auth failure)
///                             Unauthenticated ──────┘    │
///                                   ↑────────────────────┘
/// ```
///
/// Startup recovery runs once; after it settles, only login, register,
/// logout, and refresh move between the two settled phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
}

impl AuthPhase {
    /// `true` once startup recovery has reached a decision.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Unauthenticated)
    }
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Unauthenticated => write!(f, "Unauthenticated"),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Snapshot of the controller's in-memory state.
///
/// `busy` is raised while a login or refresh is in flight; registration
/// never raises it. `error` holds the message of the last failed sign-in.
#[derive(Clone, PartialEq, Default)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub busy: bool,
    pub error: Option<String>,
}

impl AuthState {
    /// Startup hasn't settled yet, or a login/refresh is running.
    pub fn is_loading(&self) -> bool {
        !self.phase.is_settled() || self.busy
    }

    /// Settled as authenticated with a token in hand.
    ///
    /// The profile may still be missing when startup kept a token after a
    /// network failure; it arrives with the next successful refresh.
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.token.is_some()
    }

    pub(crate) fn signed_out() -> Self {
        Self {
            phase: AuthPhase::Unauthenticated,
            ..Self::default()
        }
    }
}

/// Hand-written so the token never ends up in logs.
impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("phase", &self.phase)
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("busy", &self.busy)
            .field("error", &self.error)
            .finish()
    }
}
