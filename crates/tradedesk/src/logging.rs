//! Tracing subscriber setup for consoles built on Tradedesk.
//!
//! Library crates only emit `tracing` events; a binary calls [`init`] once
//! to print them. `RUST_LOG` wins over the default filter when set.

use tracing_subscriber::EnvFilter;

use crate::TradedeskError;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a formatted stderr subscriber.
///
/// `default_filter` is used when `RUST_LOG` is unset or unparsable, e.g.
/// `"info,tradedesk_transport=debug"`.
///
/// # Errors
/// [`TradedeskError::Logging`] if `default_filter` doesn't parse or a
/// global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), TradedeskError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| TradedeskError::Logging(format!("bad filter {default_filter:?}: {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| TradedeskError::Logging(e.to_string()))
}
