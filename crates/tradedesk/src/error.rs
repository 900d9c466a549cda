//! Unified error type for Tradedesk.

use tradedesk_guard::GuardError;
use tradedesk_protocol::ProtocolError;
use tradedesk_session::SessionError;
use tradedesk_store::StoreError;
use tradedesk_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tradedesk` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TradedeskError {
    /// Client setup failed (bad base URL, HTTP client construction).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session store couldn't be opened, read, or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session operation failed (rejected sign-in, not signed in).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The route guard was misconfigured.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The tracing subscriber couldn't be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
