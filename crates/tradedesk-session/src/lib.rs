//! Authentication session lifecycle for Tradedesk.
//!
//! This crate decides who is signed in:
//!
//! 1. **Startup recovery**: adopting a stored session on launch, trusting
//!    the cached profile when it can and the backend when it must
//! 2. **Sign-in**: login and registration through an
//!    [`AuthBackend`](tradedesk_transport::AuthBackend)
//! 3. **Revalidation and sign-out**: token refresh, logout, and clearing
//!    the session when the backend rejects the token
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard Layer (above)  ← reads AuthState to decide what to render
//!     ↕
//! Session Layer (this crate)  ← AuthController, the only writer of session state
//!     ↕
//! Store + Transport (below)  ← persisted token/profile, backend calls, error classes
//! ```

mod controller;
mod error;
mod state;

pub use controller::AuthController;
pub use error::SessionError;
pub use state::{AuthPhase, AuthState, SessionConfig};
