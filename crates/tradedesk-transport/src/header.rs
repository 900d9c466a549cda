//! The shared `Authorization` header.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// The bearer credential attached to every outgoing request.
///
/// One `AuthHeader` is shared (by cloning) between the session controller,
/// which is its only writer, and every backend that sends requests. Writes
/// are synchronous, so a request issued right after a login or logout
/// always sees the new value.
#[derive(Clone, Default)]
pub struct AuthHeader {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `token` as the bearer credential.
    pub fn set_bearer(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    /// Removes the credential; subsequent requests go out anonymous.
    pub fn clear(&self) {
        *self.token.write() = None;
    }

    /// The full header value, e.g. `Bearer eyJ...`.
    pub fn value(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| format!("Bearer {t}"))
    }

    /// The raw token currently installed.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.token.read().is_some()
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("set", &self.is_set())
            .finish()
    }
}
