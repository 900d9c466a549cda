//! Wire types for the Tradedesk admin console.
//!
//! This crate defines what the console and the backend auth endpoints
//! exchange:
//!
//! - **Types** ([`Credentials`], [`Registration`], [`AuthResponse`],
//!   [`UserProfile`]): request and response bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values are
//!   turned into strings for the wire and for the session store.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (HTTP) → Protocol (AuthResponse, UserProfile) → Session (auth state)
//!                           ↘ Store (serialized profile snapshot)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{AuthResponse, Credentials, Registration, Role, UserId, UserProfile};
