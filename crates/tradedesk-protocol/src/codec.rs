//! Codec trait and implementations for serializing protocol values.
//!
//! The session store keeps the user profile as a string entry and the HTTP
//! layer sends JSON bodies. Both go through a [`Codec`] so neither has to
//! know which text format is in use.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to text and decode them back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → shareable between the controller and background
///   refresh tasks.
/// - `'static` → the codec owns everything it needs.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the decoded value
/// doesn't borrow from the input, so the stored string can be dropped
/// right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a string.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a string back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or doesn't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what the backend speaks and what browser-era snapshots were
/// stored as, so cached profiles stay readable by hand.
///
/// ## Example
///
/// ```rust
/// use tradedesk_protocol::{Codec, JsonCodec, Role, UserId, UserProfile};
///
/// let codec = JsonCodec;
/// let user = UserProfile::new(UserId::from("u-1"), "ops@example.com", Role::Admin);
///
/// let text = codec.encode(&user).unwrap();
/// let decoded: UserProfile = codec.decode(&text).unwrap();
/// assert_eq!(user, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(data).map_err(ProtocolError::Decode)
    }
}
