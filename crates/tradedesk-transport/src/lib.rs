//! Backend seam for Tradedesk.
//!
//! Provides the [`AuthBackend`] trait the session layer calls, the shared
//! [`AuthHeader`], and the error classifier ([`classify`],
//! [`is_retryable_error`], [`retry_delay`]) that turns a [`FailedCall`]
//! into an [`ApiError`].
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpBackend`] via `reqwest`

#![allow(async_fn_in_trait)]

mod classify;
mod config;
mod error;
mod header;
#[cfg(feature = "http")]
mod http;
mod retry;

pub use classify::{ApiError, ErrorKind, FailedCall, classify, is_retryable_error};
pub use config::ClientConfig;
pub use error::TransportError;
pub use header::AuthHeader;
#[cfg(feature = "http")]
pub use http::HttpBackend;
pub use retry::{BASE_RETRY_DELAY, MAX_RETRY_DELAY, retry_delay, with_retry};

use std::future::Future;

use tradedesk_protocol::{AuthResponse, Credentials, Registration, UserProfile};

/// The backend operations the session layer needs.
///
/// Tradedesk doesn't implement the API; it only calls it. Production uses
/// [`HttpBackend`]; tests use a scripted mock. Failures are reported raw
/// as [`FailedCall`] and classified by the caller.
///
/// # Trait bounds
///
/// - `Send + Sync` → the controller and the refresh task call it from
///   different tasks.
/// - `'static` → the backend lives as long as the console.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges credentials for a token and profile.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthResponse, FailedCall>> + Send;

    /// Creates an account and signs it in.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthResponse, FailedCall>> + Send;

    /// Fetches the profile of whoever the current [`AuthHeader`] token
    /// belongs to.
    fn profile(&self) -> impl Future<Output = Result<UserProfile, FailedCall>> + Send;
}
