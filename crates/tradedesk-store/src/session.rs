//! The session store: the console's durable record of who is signed in.
//!
//! Three independent string entries make up a stored session:
//!
//! | key (default)        | value                                  |
//! |----------------------|----------------------------------------|
//! | `auth_token`         | the opaque bearer token                |
//! | `auth_token_expiry`  | absolute expiry, epoch milliseconds    |
//! | `auth_user`          | JSON snapshot of the [`UserProfile`]   |
//!
//! The expiry entry is optional. A token stored without one never expires
//! client-side; that is what happens when the backend omits `expiresIn`.
//!
//! Reads never fail: a backend error or an undecodable entry is logged and
//! reported as "absent", so the store can be consulted before anything
//! else in the console is ready.

use std::sync::Arc;
use std::time::Duration;

use tradedesk_protocol::{Codec, JsonCodec, UserProfile};

use crate::{Clock, KeyValueStore, StoreError, SystemClock, Write};

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Storage keys and the refresh window.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub token_key: String,
    pub expiry_key: String,
    pub user_key: String,

    /// A token closer than this to its expiry [needs a refresh](SessionStore::needs_refresh).
    ///
    /// Default: 5 minutes.
    pub refresh_threshold: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            token_key: "auth_token".into(),
            expiry_key: "auth_token_expiry".into(),
            user_key: "auth_user".into(),
            refresh_threshold: Duration::from_secs(5 * 60),
        }
    }
}

/// What the expiry entry currently says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredExpiry {
    /// No expiry recorded: the token never expires.
    Never,
    /// Expires at this epoch-millisecond instant.
    At(u64),
    /// An entry exists but isn't a number. Treated as already expired.
    Unreadable,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Persists the bearer token, its expiry, and the cached user profile.
///
/// Cheap to clone: clones share the same backend and clock, so the
/// controller, route guard, and refresh task all see one session.
///
/// ## Lifecycle
///
/// ```text
/// set_token() + set_user() ──→ [stored] ──→ clear_session() ──→ [empty]
///                                 │
///                                 ├─ is_expired() / has_valid_token()
///                                 └─ time_until_expiry() / needs_refresh()
/// ```
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    codec: JsonCodec,
    config: StoreConfig,
}

impl SessionStore {
    /// Creates a store over `kv` that reads time from the system clock.
    pub fn new(kv: Arc<dyn KeyValueStore>, config: StoreConfig) -> Self {
        Self::with_clock(kv, Arc::new(SystemClock), config)
    }

    /// Creates a store with an explicit clock (tests use [`ManualClock`](crate::ManualClock)).
    pub fn with_clock(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> Self {
        Self {
            kv,
            clock,
            codec: JsonCodec,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Persists a token, with an expiry `expires_in_secs` from now if given.
    ///
    /// Without a duration any previously stored expiry is removed, so the
    /// new token never expires client-side. Token and expiry are written
    /// in one batch.
    ///
    /// # Errors
    /// Returns the backend's [`StoreError`] if the write fails.
    pub fn set_token(
        &self,
        token: &str,
        expires_in_secs: Option<u64>,
    ) -> Result<(), StoreError> {
        let expiry = expires_in_secs.map(|secs| {
            self.clock
                .now_millis()
                .saturating_add(secs.saturating_mul(1_000))
                .to_string()
        });

        let writes = match &expiry {
            Some(at) => [
                Write::Set(&self.config.token_key, token),
                Write::Set(&self.config.expiry_key, at),
            ],
            None => [
                Write::Set(&self.config.token_key, token),
                Write::Remove(&self.config.expiry_key),
            ],
        };
        self.kv.apply(&writes)?;

        tracing::debug!(expires_in_secs = ?expires_in_secs, "session token stored");
        Ok(())
    }

    /// The stored token, or `None`. An empty string counts as absent.
    pub fn token(&self) -> Option<String> {
        self.read(&self.config.token_key).filter(|t| !t.is_empty())
    }

    /// The stored expiry instant in epoch milliseconds, if readable.
    pub fn expires_at(&self) -> Option<u64> {
        match self.expiry() {
            StoredExpiry::At(at) => Some(at),
            StoredExpiry::Never | StoredExpiry::Unreadable => None,
        }
    }

    /// `false` without a recorded expiry, otherwise `now > expiry`.
    pub fn is_expired(&self) -> bool {
        match self.expiry() {
            StoredExpiry::Never => false,
            StoredExpiry::At(at) => self.clock.now_millis() > at,
            StoredExpiry::Unreadable => true,
        }
    }

    /// A token is stored and it isn't expired.
    pub fn has_valid_token(&self) -> bool {
        self.token().is_some() && !self.is_expired()
    }

    /// Caches a serialized snapshot of the profile.
    ///
    /// # Errors
    /// - [`StoreError::Protocol`] if the profile can't be encoded
    /// - the backend's error if the write fails
    pub fn set_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        let snapshot = self.codec.encode(user)?;
        self.kv.set(&self.config.user_key, &snapshot)?;
        tracing::debug!(user_id = %user.id, "user snapshot cached");
        Ok(())
    }

    /// The cached profile. A snapshot that no longer decodes reads as `None`.
    pub fn user(&self) -> Option<UserProfile> {
        let snapshot = self.read(&self.config.user_key)?;
        match self.codec.decode(&snapshot) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable user snapshot");
                None
            }
        }
    }

    /// Removes token, expiry, and user snapshot in a single batch.
    ///
    /// # Errors
    /// Returns the backend's [`StoreError`] if the write fails.
    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.kv.apply(&[
            Write::Remove(&self.config.token_key),
            Write::Remove(&self.config.expiry_key),
            Write::Remove(&self.config.user_key),
        ])?;
        tracing::debug!("session cleared");
        Ok(())
    }

    /// Time left before the token expires; zero once it has.
    ///
    /// `None` when no expiry is recorded.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        match self.expiry() {
            StoredExpiry::Never => None,
            StoredExpiry::At(at) => Some(Duration::from_millis(
                at.saturating_sub(self.clock.now_millis()),
            )),
            StoredExpiry::Unreadable => Some(Duration::ZERO),
        }
    }

    /// The expiry is known and closer than the refresh threshold.
    pub fn needs_refresh(&self) -> bool {
        self.time_until_expiry()
            .is_some_and(|left| left < self.config.refresh_threshold)
    }

    fn expiry(&self) -> StoredExpiry {
        match self.read(&self.config.expiry_key) {
            None => StoredExpiry::Never,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(at) => StoredExpiry::At(at),
                Err(_) => {
                    tracing::warn!(raw = %raw, "unreadable token expiry, treating as expired");
                    StoredExpiry::Unreadable
                }
            },
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "session store read failed");
                None
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
