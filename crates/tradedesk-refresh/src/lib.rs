//! Background session revalidation for Tradedesk.
//!
//! A [`RefreshScheduler`] wakes on a fixed interval and, when the stored
//! token is close to expiring, asks the [`AuthController`] to revalidate
//! it against the profile endpoint. It stops on its own once the session
//! is over:
//!
//! ```text
//! every check_interval (first wake jittered):
//!   startup not settled          → skip
//!   signed out                   → exit SignedOut
//!   store.needs_refresh() false  → skip
//!   refresh_token() == true      → keep going
//!   refresh_token() == false     → exit RefreshFailed
//! logout (any time)              → exit SignedOut
//! handle.shutdown() / dropped    → exit Shutdown
//! ```
//!
//! Revalidation doesn't extend the token's expiry; once it lapses the
//! controller reports `false` and the scheduler exits.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};
use tradedesk_session::{AuthController, AuthPhase, AuthState};
use tradedesk_transport::AuthBackend;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scheduler timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// How often to check whether the token needs revalidating.
    pub check_interval: Duration,
    /// Random extra delay (0..max) before the first check, so consoles
    /// opened together don't all hit the backend at the same instant.
    pub initial_jitter: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            initial_jitter: Duration::from_secs(5),
        }
    }
}

impl RefreshConfig {
    /// Shortest accepted check interval.
    pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

    /// A config checking every `check_interval`, default jitter.
    pub fn with_interval(check_interval: Duration) -> Self {
        Self {
            check_interval,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`RefreshScheduler::new`]. `check_interval` is raised to
    /// [`Self::MIN_CHECK_INTERVAL`]; jitter is capped at one interval.
    pub fn validated(mut self) -> Self {
        if self.check_interval < Self::MIN_CHECK_INTERVAL {
            warn!(
                interval_ms = self.check_interval.as_millis() as u64,
                "refresh check interval below minimum, clamping"
            );
            self.check_interval = Self::MIN_CHECK_INTERVAL;
        }
        if self.initial_jitter > self.check_interval {
            self.initial_jitter = self.check_interval;
        }
        self
    }

    fn first_wake(&self) -> Duration {
        let max_ms = self.initial_jitter.as_millis() as u64;
        let jitter = if max_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..max_ms))
        } else {
            Duration::ZERO
        };
        self.check_interval + jitter
    }
}

// ---------------------------------------------------------------------------
// Exit reasons
// ---------------------------------------------------------------------------

/// Why a scheduler task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshExit {
    /// The handle asked it to stop, or was dropped.
    Shutdown,
    /// The session ended (logout, or startup found nothing to keep).
    SignedOut,
    /// Revalidation failed; the controller has cleared the session.
    RefreshFailed,
    /// The task panicked or was cancelled by the runtime.
    Aborted,
}

impl std::fmt::Display for RefreshExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shutdown => write!(f, "shutdown"),
            Self::SignedOut => write!(f, "signed out"),
            Self::RefreshFailed => write!(f, "refresh failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns a running scheduler task. Dropping it stops the task.
pub struct RefreshHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<RefreshExit>,
}

impl RefreshHandle {
    /// Stops the scheduler and waits for it to exit.
    ///
    /// Returns the exit reason, which isn't `Shutdown` if the task had
    /// already stopped on its own.
    pub async fn shutdown(self) -> RefreshExit {
        // Err means the task is already gone; its exit reason is in `task`.
        let _ = self.shutdown.send(());
        join(self.task).await
    }

    /// Waits for the scheduler to stop on its own.
    pub async fn wait(self) -> RefreshExit {
        let Self { shutdown, task } = self;
        let exit = join(task).await;
        drop(shutdown);
        exit
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn join(task: JoinHandle<RefreshExit>) -> RefreshExit {
    match task.await {
        Ok(exit) => exit,
        Err(e) => {
            warn!(error = %e, "refresh task did not finish cleanly");
            RefreshExit::Aborted
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Periodically revalidates the session of one controller.
pub struct RefreshScheduler<B: AuthBackend> {
    controller: Arc<AuthController<B>>,
    config: RefreshConfig,
}

/// Outcome of a single check.
enum Check {
    Continue,
    Exit(RefreshExit),
}

impl<B: AuthBackend> RefreshScheduler<B> {
    pub fn new(controller: Arc<AuthController<B>>, config: RefreshConfig) -> Self {
        Self {
            controller,
            config: config.validated(),
        }
    }

    /// Starts the scheduler on the current tokio runtime.
    pub fn spawn(self) -> RefreshHandle {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let first_wake = self.config.first_wake();
        debug!(
            interval_s = self.config.check_interval.as_secs(),
            first_wake_ms = first_wake.as_millis() as u64,
            "refresh scheduler started"
        );
        // Subscribe before spawning so a logout racing the first poll is seen.
        let state_rx = self.controller.subscribe();
        let task = tokio::spawn(self.run(first_wake, state_rx, shutdown_rx));
        RefreshHandle { shutdown, task }
    }

    async fn run(
        self,
        first_wake: Duration,
        mut state_rx: watch::Receiver<AuthState>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> RefreshExit {
        let mut next = Instant::now() + first_wake;

        let exit = loop {
            tokio::select! {
                _ = &mut shutdown => break RefreshExit::Shutdown,
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break RefreshExit::Shutdown;
                    }
                    let phase = state_rx.borrow_and_update().phase;
                    if phase == AuthPhase::Unauthenticated {
                        break RefreshExit::SignedOut;
                    }
                }
                _ = time::sleep_until(next) => {
                    next = Instant::now() + self.config.check_interval;
                    if let Check::Exit(exit) = self.check().await {
                        break exit;
                    }
                }
            }
        };

        info!(%exit, "refresh scheduler stopped");
        exit
    }

    async fn check(&self) -> Check {
        let state = self.controller.state();
        if !state.phase.is_settled() {
            trace!(phase = %state.phase, "session not settled, skipping check");
            return Check::Continue;
        }
        if !state.is_authenticated() {
            return Check::Exit(RefreshExit::SignedOut);
        }
        if !self.controller.store().needs_refresh() {
            trace!("token not near expiry");
            return Check::Continue;
        }

        let remaining = self.controller.store().time_until_expiry();
        debug!(remaining_s = ?remaining.map(|d| d.as_secs()), "token near expiry, revalidating");
        match self.controller.refresh_token().await {
            Ok(true) => Check::Continue,
            Ok(false) => Check::Exit(RefreshExit::RefreshFailed),
            Err(e) => {
                // Still signed in; only the profile cache write failed.
                warn!(error = %e, "revalidation could not cache the profile");
                Check::Continue
            }
        }
    }
}
