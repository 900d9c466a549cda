//! Error types for the session layer.

use tradedesk_store::StoreError;
use tradedesk_transport::ApiError;

/// Errors surfaced by the [`AuthController`](crate::AuthController).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected or failed the call. Displays as the classified
    /// message, ready to show under a sign-in form.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session couldn't be persisted.
    #[error("session storage failed: {0}")]
    Store(#[from] StoreError),

    /// The operation needs a signed-in user and there isn't one.
    #[error("not signed in")]
    NotAuthenticated,
}

impl SessionError {
    /// The classified backend error, if this came from the backend.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
