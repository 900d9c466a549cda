//! HTTP client configuration.

use std::time::Duration;

use crate::TransportError;

/// Where the backend lives and how patiently to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://api.tradedesk.io/api`.
    pub base_url: String,

    /// Per-request timeout. Default: 15 seconds.
    pub timeout: Duration,

    /// Retries for idempotent calls (the profile fetch) on network and
    /// 5xx failures. Default: 2.
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".into(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
        }
    }
}

impl ClientConfig {
    pub const ENV_API_URL: &'static str = "TRADEDESK_API_URL";
    pub const ENV_TIMEOUT_SECS: &'static str = "TRADEDESK_TIMEOUT_SECS";
    pub const ENV_MAX_RETRIES: &'static str = "TRADEDESK_MAX_RETRIES";

    /// Defaults overridden by `TRADEDESK_*` environment variables.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidConfig`] if a numeric variable
    /// doesn't parse.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TransportError> {
        let mut config = Self::default();

        if let Some(url) = lookup(Self::ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(Self::ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                TransportError::InvalidConfig(format!(
                    "{} must be a number of seconds, got {raw:?}",
                    Self::ENV_TIMEOUT_SECS
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(Self::ENV_MAX_RETRIES) {
            config.max_retries = raw.trim().parse().map_err(|_| {
                TransportError::InvalidConfig(format!(
                    "{} must be a non-negative integer, got {raw:?}",
                    Self::ENV_MAX_RETRIES
                ))
            })?;
        }

        config.validated()
    }

    /// Rejects base URLs that aren't http(s).
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidConfig`] for other schemes.
    pub fn validated(mut self) -> Result<Self, TransportError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(TransportError::InvalidConfig(format!(
                "base url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        Ok(self)
    }

    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
