//! Guard configuration and the decisions it produces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GuardError;

// ---------------------------------------------------------------------------
// GuardConfig
// ---------------------------------------------------------------------------

/// Where the guard sends people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Unauthenticated visitors of protected routes land here.
    pub sign_in_path: String,

    /// Authenticated visitors of public-only routes land here when no
    /// earlier location was remembered.
    pub landing_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/auth/sign-in".into(),
            landing_path: "/dashboard".into(),
        }
    }
}

impl GuardConfig {
    /// Checks that both paths are absolute in-app paths and differ.
    ///
    /// # Errors
    /// [`GuardError::InvalidPath`] or [`GuardError::SamePaths`].
    pub fn validated(self) -> Result<Self, GuardError> {
        check_path(&self.sign_in_path)?;
        check_path(&self.landing_path)?;
        if self.sign_in_path == self.landing_path {
            return Err(GuardError::SamePaths(self.sign_in_path));
        }
        Ok(self)
    }

    /// `true` if `location` is the sign-in page, ignoring any query string
    /// or trailing slash.
    pub fn is_sign_in(&self, location: &str) -> bool {
        strip_location(location) == strip_location(&self.sign_in_path)
    }
}

/// Returns `true` if `location` stays on this console: a rooted path, not
/// a protocol-relative or absolute URL.
pub(crate) fn is_local_path(location: &str) -> bool {
    check_path(location).is_ok()
}

fn check_path(path: &str) -> Result<(), GuardError> {
    let reason = if !path.starts_with('/') {
        "must start with '/'"
    } else if path.starts_with("//") || path.starts_with("/\\") {
        "must not be protocol-relative"
    } else {
        return Ok(());
    };
    Err(GuardError::InvalidPath {
        path: path.to_string(),
        reason,
    })
}

fn strip_location(location: &str) -> &str {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

// ---------------------------------------------------------------------------
// GuardDecision
// ---------------------------------------------------------------------------

/// What the console should do with a navigation.
///
/// ```text
/// Loading  → show a spinner; the session isn't settled yet
/// Render   → show the requested route
/// Redirect → navigate to `to`; `from` is the location to come back to
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    Loading,
    Redirect { to: String, from: Option<String> },
}

impl GuardDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The redirect target, if this is a redirect.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect { to, .. } => Some(to),
            _ => None,
        }
    }
}

impl fmt::Display for GuardDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render => write!(f, "render"),
            Self::Loading => write!(f, "loading"),
            Self::Redirect { to, from: Some(from) } => write!(f, "redirect {to} (from {from})"),
            Self::Redirect { to, from: None } => write!(f, "redirect {to}"),
        }
    }
}
