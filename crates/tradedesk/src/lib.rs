//! # Tradedesk
//!
//! Session core for the Tradedesk trading-platform admin console.
//!
//! Tradedesk decides who is signed in and what they may see: it persists
//! the bearer token and profile, recovers them on launch, signs users in
//! and out against the platform API, classifies backend failures into
//! user-facing messages, and answers route-guard questions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tradedesk::prelude::*;
//!
//! # async fn run() -> Result<(), TradedeskError> {
//! tradedesk::logging::init("info")?;
//!
//! let desk = Tradedesk::builder()
//!     .client_config(ClientConfig::from_env()?)
//!     .file_storage("session.json")
//!     .build()?;
//!
//! if desk.startup().await == AuthPhase::Unauthenticated {
//!     desk.controller()
//!         .login(&Credentials::new("ops@example.com", "secret"))
//!         .await?;
//! }
//! let _refresh = desk.spawn_refresh();
//! assert!(desk.guard().protected("/dashboard").is_render());
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Layer     | Crate                  | Provides                                  |
//! |-----------|------------------------|-------------------------------------------|
//! | Protocol  | [`protocol`]           | wire types, JSON codec                    |
//! | Store     | [`store`]              | `SessionStore`, memory and file backends  |
//! | Transport | [`transport`]          | `AuthBackend`, HTTP client, classifier    |
//! | Session   | [`session`]            | `AuthController`                          |
//! | Guard     | [`guard`]              | `RouteGuard`                              |
//! | Refresh   | [`refresh`]            | background revalidation                   |

mod context;
mod error;
pub mod logging;

pub use context::{Tradedesk, TradedeskBuilder};
pub use error::TradedeskError;

pub use tradedesk_guard as guard;
pub use tradedesk_protocol as protocol;
pub use tradedesk_refresh as refresh;
pub use tradedesk_session as session;
pub use tradedesk_store as store;
pub use tradedesk_transport as transport;

/// Everything a console usually needs, in one import.
pub mod prelude {
    pub use crate::{Tradedesk, TradedeskBuilder, TradedeskError};
    pub use tradedesk_guard::{GuardConfig, GuardDecision, RouteGuard};
    pub use tradedesk_protocol::{AuthResponse, Credentials, Registration, Role, UserId, UserProfile};
    pub use tradedesk_refresh::{RefreshConfig, RefreshExit, RefreshHandle};
    pub use tradedesk_session::{AuthController, AuthPhase, AuthState, SessionConfig, SessionError};
    pub use tradedesk_store::{FileStore, MemoryStore, SessionStore, StoreConfig};
    pub use tradedesk_transport::{
        ApiError, AuthBackend, AuthHeader, ClientConfig, ErrorKind, FailedCall, HttpBackend,
        classify,
    };
}
