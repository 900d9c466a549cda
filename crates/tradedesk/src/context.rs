//! `Tradedesk` builder and session context.
//!
//! This is the entry point for a console. It ties together all the
//! layers: store → transport → session → guard, and starts the refresh
//! scheduler on request.

use std::path::PathBuf;
use std::sync::Arc;

use tradedesk_guard::{GuardConfig, RouteGuard};
use tradedesk_refresh::{RefreshConfig, RefreshHandle, RefreshScheduler};
use tradedesk_session::{AuthController, AuthPhase, AuthState, SessionConfig};
use tradedesk_store::{
    Clock, FileStore, KeyValueStore, MemoryStore, SessionStore, StoreConfig, SystemClock,
};
use tradedesk_transport::{AuthBackend, AuthHeader, ClientConfig, HttpBackend};

use crate::TradedeskError;

/// Where the session is persisted.
enum Storage {
    Memory,
    File(PathBuf),
    Custom(Arc<dyn KeyValueStore>),
}

/// Builder for assembling a [`Tradedesk`] context.
///
/// # Example
///
/// ```rust,no_run
/// use tradedesk::prelude::*;
///
/// # async fn run() -> Result<(), TradedeskError> {
/// let desk = Tradedesk::builder()
///     .client_config(ClientConfig::from_env()?)
///     .file_storage("/var/lib/tradedesk/session.json")
///     .build()?;
///
/// desk.startup().await;
/// let decision = desk.guard().protected("/dashboard");
/// # Ok(())
/// # }
/// ```
pub struct TradedeskBuilder {
    client: ClientConfig,
    store: StoreConfig,
    session: SessionConfig,
    guard: GuardConfig,
    refresh: RefreshConfig,
    storage: Storage,
    clock: Option<Arc<dyn Clock>>,
}

impl TradedeskBuilder {
    /// Creates a builder with default settings and in-memory storage.
    pub fn new() -> Self {
        Self {
            client: ClientConfig::default(),
            store: StoreConfig::default(),
            session: SessionConfig::default(),
            guard: GuardConfig::default(),
            refresh: RefreshConfig::default(),
            storage: Storage::Memory,
            clock: None,
        }
    }

    /// Sets the backend client configuration.
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client = config;
        self
    }

    /// Sets the storage key names and refresh threshold.
    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store = config;
        self
    }

    /// Sets the controller behavior switches.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Sets the sign-in and landing paths.
    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.guard = config;
        self
    }

    /// Sets the refresh scheduler timing.
    pub fn refresh_config(mut self, config: RefreshConfig) -> Self {
        self.refresh = config;
        self
    }

    /// Keeps the session in memory only. This is the default.
    pub fn memory_storage(mut self) -> Self {
        self.storage = Storage::Memory;
        self
    }

    /// Persists the session to a JSON file, created on first write.
    pub fn file_storage(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = Storage::File(path.into());
        self
    }

    /// Persists the session through a caller-supplied backend.
    pub fn storage(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Storage::Custom(kv);
        self
    }

    /// Replaces the system clock, e.g. with a `ManualClock` in tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds a context talking to the HTTP API in the client config.
    ///
    /// # Errors
    /// - [`TradedeskError::Transport`] for a bad client config
    /// - [`TradedeskError::Store`] if the session file can't be opened
    /// - [`TradedeskError::Guard`] for bad guard paths
    pub fn build(self) -> Result<Tradedesk<HttpBackend>, TradedeskError> {
        let client = self.client.clone().validated()?;
        self.build_with_backend(move |header| HttpBackend::new(client, header))
    }

    /// Builds a context around a custom backend.
    ///
    /// `make_backend` receives the [`AuthHeader`] the controller will keep
    /// current; the backend should attach it to authenticated calls.
    pub fn build_with_backend<B, E>(
        self,
        make_backend: impl FnOnce(AuthHeader) -> Result<B, E>,
    ) -> Result<Tradedesk<B>, TradedeskError>
    where
        B: AuthBackend,
        TradedeskError: From<E>,
    {
        let guard_config = self.guard.validated()?;

        let kv: Arc<dyn KeyValueStore> = match self.storage {
            Storage::Memory => Arc::new(MemoryStore::new()),
            Storage::File(path) => {
                let store = FileStore::open(&path)?;
                tracing::debug!(path = %path.display(), "opened session file");
                Arc::new(store)
            }
            Storage::Custom(kv) => kv,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = SessionStore::with_clock(kv, clock, self.store);

        let header = AuthHeader::new();
        let backend = make_backend(header.clone())?;
        let controller = Arc::new(AuthController::new(
            backend,
            store,
            header,
            self.session,
        ));
        let guard = RouteGuard::new(Arc::clone(&controller), guard_config);

        Ok(Tradedesk {
            controller,
            guard,
            refresh: self.refresh,
        })
    }
}

impl Default for TradedeskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An assembled session context: one controller, its store and header,
/// and a guard reading from it.
///
/// Cheap to clone; clones share the same session.
pub struct Tradedesk<B: AuthBackend> {
    controller: Arc<AuthController<B>>,
    guard: RouteGuard<B>,
    refresh: RefreshConfig,
}

impl<B: AuthBackend> Clone for Tradedesk<B> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            guard: self.guard.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

impl Tradedesk<HttpBackend> {
    /// Creates a new builder.
    pub fn builder() -> TradedeskBuilder {
        TradedeskBuilder::new()
    }
}

impl<B: AuthBackend> Tradedesk<B> {
    pub fn controller(&self) -> &Arc<AuthController<B>> {
        &self.controller
    }

    pub fn guard(&self) -> &RouteGuard<B> {
        &self.guard
    }

    pub fn store(&self) -> &SessionStore {
        self.controller.store()
    }

    pub fn header(&self) -> &AuthHeader {
        self.controller.header()
    }

    /// The controller's current state.
    pub fn state(&self) -> AuthState {
        self.controller.state()
    }

    /// Runs startup recovery. See [`AuthController::startup`].
    pub async fn startup(&self) -> AuthPhase {
        self.controller.startup().await
    }

    /// Starts background revalidation for the current session.
    ///
    /// Call after startup or sign-in: the scheduler exits as soon as it
    /// sees the session signed out.
    pub fn spawn_refresh(&self) -> RefreshHandle {
        RefreshScheduler::new(Arc::clone(&self.controller), self.refresh.clone()).spawn()
    }
}
