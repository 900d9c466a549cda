//! Error types for the protocol layer.
//!
//! Each Tradedesk crate defines its own error enum, so a `ProtocolError`
//! always means a serialization problem, never a network or storage one.

/// Errors that can occur while encoding or decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into text).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning text into a Rust value).
    ///
    /// Common causes: a truncated snapshot, a missing required field, or
    /// a profile written by an incompatible version of the console.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value decoded but violates a protocol rule, e.g. an auth
    /// response carrying an empty token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
