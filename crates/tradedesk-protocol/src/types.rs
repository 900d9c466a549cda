//! Request and response bodies for the backend auth endpoints.
//!
//! Field names follow the backend's JSON (camelCase), so
//! `#[serde(rename_all = "camelCase")]` sits on every struct here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Backend identifier of a console user.
///
/// Newtype over the backend's opaque id string so it can't be mixed up
/// with a token or an email. `#[serde(transparent)]` keeps it a plain
/// string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role the backend assigned to a user.
///
/// Roles the console doesn't know about decode as [`Role::Other`] with the
/// backend's string kept, so a new backend role neither wipes a cached
/// session nor gets rewritten when the profile is cached again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
    Other(String),
}

impl Role {
    /// Returns `true` for roles allowed into the admin console.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }

    /// The role as the backend spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "super_admin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// The signed-in principal as returned by the profile endpoint.
///
/// The session store caches this verbatim. Fields the console doesn't
/// model (platform-specific flags, timestamps, ...) are kept in `extra`
/// via `#[serde(flatten)]`, so a cached snapshot round-trips to exactly
/// what the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Creates an active, unverified profile with no wallet data.
    pub fn new(id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            username: None,
            role,
            wallet_address: None,
            balance: None,
            is_active: true,
            is_verified: false,
            extra: Map::new(),
        }
    }

    /// Name to show in the console header: username, else email.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Hand-written so passwords never reach a log line.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .field("wallet_address", &self.wallet_address)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AuthResponse
// ---------------------------------------------------------------------------

/// Body returned by both login and registration.
///
/// `expires_in` is a duration in seconds. The backend may omit it, in
/// which case the token is stored without an expiry and never expires
/// client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub user: UserProfile,
}

impl AuthResponse {
    /// Rejects responses that decode but can't establish a session.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] for a blank token.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.token.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "auth response carries an empty token".into(),
            ));
        }
        Ok(())
    }
}
