//! Error types for the store layer.

use tradedesk_protocol::ProtocolError;

/// Errors that can occur while persisting session data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but isn't a JSON object of strings.
    /// The console refuses to guess and leaves the file alone.
    #[error("storage file is corrupt: {0}")]
    Corrupt(String),

    /// The profile snapshot couldn't be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A custom backend reported a failure.
    #[error("storage backend failed: {0}")]
    Backend(String),
}
