//! Error types for the guard layer.

/// Errors raised while configuring a [`RouteGuard`](crate::RouteGuard).
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A configured path isn't an absolute in-app path.
    #[error("invalid route path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Sign-in and landing paths must differ, otherwise an authenticated
    /// user would be bounced between them.
    #[error("sign-in and landing paths are both {0:?}")]
    SamePaths(String),
}
