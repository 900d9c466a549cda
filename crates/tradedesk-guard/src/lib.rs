//! Route access decisions for the Tradedesk admin console.
//!
//! Every navigation asks the guard one question: may this route render
//! right now? The answer is a [`GuardDecision`].
//!
//! # Key types
//!
//! - [`RouteGuard`]: decides for protected and public-only routes
//! - [`GuardDecision`]: render, show loading, or redirect
//! - [`GuardConfig`]: the sign-in and landing paths
//!
//! # Rules
//!
//! ```text
//! protected(location):
//!   in-memory user, or cached user + valid token,
//!   or settled Authenticated with a token      → Render
//!   startup not settled                        → Loading
//!   otherwise                                  → Redirect(sign-in, from: location)
//!
//! public_only(location, remembered):
//!   startup not settled                        → Loading
//!   authenticated                              → Redirect(remembered or landing)
//!   otherwise                                  → Render
//! ```

mod config;
mod error;
mod guard;

pub use config::{GuardConfig, GuardDecision};
pub use error::GuardError;
pub use guard::RouteGuard;
