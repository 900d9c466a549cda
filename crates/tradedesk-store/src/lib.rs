//! Session persistence for Tradedesk.
//!
//! This crate owns everything the console remembers between restarts:
//!
//! 1. **Key-value backends**: the narrow [`KeyValueStore`] trait, with an
//!    in-memory [`MemoryStore`] and a JSON-file [`FileStore`]
//! 2. **Session store**: [`SessionStore`], which keeps the bearer token,
//!    its expiry instant, and the cached [`UserProfile`] snapshot
//! 3. **Time**: the [`Clock`] trait, so expiry can be tested against
//!    virtual time ([`ManualClock`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← reads/writes the token and profile on every transition
//!     ↕
//! Store Layer (this crate)  ← persisted token, expiry, profile snapshot
//!     ↕
//! Protocol Layer (below)  ← provides UserProfile and the JSON codec
//! ```
//!
//! [`UserProfile`]: tradedesk_protocol::UserProfile

mod clock;
mod error;
mod file;
mod kv;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use file::FileStore;
pub use kv::{KeyValueStore, MemoryStore, Write};
pub use session::{SessionStore, StoreConfig};
