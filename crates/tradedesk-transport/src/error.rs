/// Errors that can occur while setting up the transport layer.
///
/// Failures of individual backend calls are not errors of this type: they
/// come back as [`FailedCall`](crate::FailedCall) values for the session
/// layer to [`classify`](crate::classify).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A configuration value is missing or malformed.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client couldn't be built.
    #[cfg(feature = "http")]
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}
