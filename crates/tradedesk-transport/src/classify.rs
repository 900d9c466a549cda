//! Turning a failed backend call into something the session layer can act on.
//!
//! The backend fails in many shapes: no response at all, a 401, a 500 with
//! an HTML body, a 200 whose body doesn't decode. [`classify`] folds every
//! one of them into an [`ApiError`] with a fixed [`ErrorKind`], and never
//! fails itself.

use serde_json::Value;
use std::fmt;

/// Error codes that mean "the request never got an answer".
const NETWORK_CODES: &[&str] = &[
    "ERR_NETWORK",
    "ECONNREFUSED",
    "ECONNRESET",
    "ECONNABORTED",
    "ETIMEDOUT",
];

const NETWORK_MESSAGE: &str = "Network Error";

// ---------------------------------------------------------------------------
// FailedCall
// ---------------------------------------------------------------------------

/// Everything known about a backend call that didn't succeed.
///
/// `status` is kept apart from `has_response`: some HTTP stacks attach a
/// status to errors that never produced a response, and those still
/// classify as network errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailedCall {
    /// Did any response come back?
    pub has_response: bool,
    /// HTTP status, if one was reported.
    pub status: Option<u16>,
    /// Parsed JSON body of the response, if it had one.
    pub body: Option<Value>,
    /// Low-level error code (`ECONNREFUSED`, `ERR_NETWORK`, ...).
    pub code: Option<String>,
    /// Message from the underlying failure.
    pub message: Option<String>,
}

impl FailedCall {
    /// The request never reached the backend, or no answer came back.
    pub fn network(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.to_string()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// The backend answered with a non-success status.
    pub fn status(status: u16, body: Option<Value>) -> Self {
        Self {
            has_response: true,
            status: Some(status),
            body,
            ..Self::default()
        }
    }

    /// The backend answered, but the answer was unusable (e.g. a success
    /// status with a body that doesn't decode).
    pub fn malformed(status: u16, message: impl Into<String>) -> Self {
        Self {
            has_response: true,
            status: Some(status),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// The fixed taxonomy of backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response, or a recognized network failure.
    Network,
    /// 401: the token is missing, invalid, or expired.
    Auth,
    /// 403: authenticated, but not allowed.
    Permission,
    /// 5xx.
    Server,
    /// Any other 4xx.
    Client,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Server => "server",
            Self::Client => "client",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified backend failure.
///
/// Displays as its human-readable `message`, which is what the console
/// shows inline on the sign-in and registration forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub kind: ErrorKind,
    pub status: Option<u16>,
    /// The failure happened before any response arrived.
    pub is_network: bool,
    /// The backend rejected the credentials (401 or 403). Failures with
    /// this flag always end the session.
    pub is_auth: bool,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            kind,
            status,
            is_network: kind == ErrorKind::Network,
            is_auth: matches!(kind, ErrorKind::Auth | ErrorKind::Permission),
        }
    }
}

/// Classifies a failed call. First match wins:
///
/// 1. no response, or a network code/message → [`ErrorKind::Network`]
/// 2. 401 → [`ErrorKind::Auth`]
/// 3. 403 → [`ErrorKind::Permission`]
///
///    Both keep the body's `message` or `error` field when present, so a
///    rejected sign-in shows the backend's own wording.
/// 4. ≥ 500 → [`ErrorKind::Server`]
/// 5. 400..500 → [`ErrorKind::Client`], message from the body's
///    `message` or `error` field when present
/// 6. anything else → [`ErrorKind::Unknown`]
pub fn classify(failed: &FailedCall) -> ApiError {
    let network_signal = failed
        .code
        .as_deref()
        .is_some_and(|code| NETWORK_CODES.contains(&code))
        || failed.message.as_deref() == Some(NETWORK_MESSAGE);

    if !failed.has_response || network_signal {
        return ApiError::new(
            ErrorKind::Network,
            "Network error. Please check your connection.",
            None,
        );
    }

    match failed.status {
        Some(401) => ApiError::new(
            ErrorKind::Auth,
            body_message(failed.body.as_ref())
                .unwrap_or_else(|| "Authentication failed. Please sign in again.".into()),
            Some(401),
        ),
        Some(403) => ApiError::new(
            ErrorKind::Permission,
            body_message(failed.body.as_ref())
                .unwrap_or_else(|| "You do not have permission to perform this action.".into()),
            Some(403),
        ),
        Some(status) if status >= 500 => ApiError::new(
            ErrorKind::Server,
            "Server error. Please try again later.",
            Some(status),
        ),
        Some(status) if status >= 400 => {
            let message = body_message(failed.body.as_ref())
                .unwrap_or_else(|| format!("Request failed with status {status}"));
            ApiError::new(ErrorKind::Client, message, Some(status))
        }
        status => ApiError::new(
            ErrorKind::Unknown,
            failed
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "An unexpected error occurred.".into()),
            status,
        ),
    }
}

/// Network failures and 5xx responses are worth retrying.
pub fn is_retryable_error(error: &ApiError) -> bool {
    error.is_network || error.status.is_some_and(|s| s >= 500)
}

fn body_message(body: Option<&Value>) -> Option<String> {
    let body = body?;
    ["message", "error"]
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
