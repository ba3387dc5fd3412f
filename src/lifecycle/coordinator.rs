//! Graceful shutdown coordination for one server run.
//!
//! # Data Flow
//! ```text
//! caller token ──child──▶ run token ◀── cancelled by either task on exit
//!                             │
//!        ┌────────────────────┴────────────────────┐
//!   serve task                                stop task
//!   server.serve()                            wait: run token | signal
//!   (skipped if already cancelled)            server.shutdown(now + grace)
//!        └────────────────────┬────────────────────┘
//!                         join both
//!                             ▼
//!                   Ok(()) | LifecycleError
//! ```
//!
//! # Design Decisions
//! - Both tasks are joined in place, so the server is borrowed, not moved
//! - The grace deadline starts after the stop decision and ignores the
//!   caller's own cancellation
//! - The coordinator enforces the deadline itself, so a misbehaving
//!   server cannot hang the run

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ShutdownConfig;
use crate::lifecycle::error::{Failure, LifecycleError};
use crate::lifecycle::server::{Server, ShutdownError};
use crate::lifecycle::signals::{Signal, SignalListener};

/// Time allowed for in-flight work once shutdown begins.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No run has started.
    Idle,
    /// Run started, serve loop not yet entered.
    Starting,
    /// Serve loop entered.
    Serving,
    /// Stop decided, shutdown in progress.
    ShuttingDown,
    /// Both tasks finished.
    Stopped,
}

/// Runs a [`Server`] until it fails, a watched signal arrives, or the
/// caller cancels, then shuts it down within the grace period.
#[derive(Debug)]
pub struct Lifecycle {
    signals: Vec<Signal>,
    grace_period: Duration,
    phase: watch::Sender<Phase>,
}

impl Lifecycle {
    /// Watches SIGINT and SIGTERM with the default grace period.
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            signals: vec![Signal::Interrupt, Signal::Terminate],
            grace_period: DEFAULT_GRACE_PERIOD,
            phase,
        }
    }

    pub fn from_config(config: &ShutdownConfig) -> Self {
        Self::new()
            .with_signals(config.signals.iter().copied())
            .with_grace_period(config.grace_period())
    }

    /// Replace the watched signal set. An empty set waits on cancellation only.
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Subscribe to phase changes.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Run `server`, watching the configured OS signals.
    ///
    /// Signals are registered before the server starts and released when
    /// the run ends. A registration failure aborts the run before serving.
    pub async fn run<S: Server>(
        &self,
        cancel: &CancellationToken,
        server: &S,
    ) -> Result<(), LifecycleError> {
        self.run_registered(cancel, server, SignalListener::register(&self.signals))
            .await
    }

    async fn run_registered<S: Server>(
        &self,
        cancel: &CancellationToken,
        server: &S,
        registered: std::io::Result<SignalListener>,
    ) -> Result<(), LifecycleError> {
        let mut listener = match registered {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "register signal handlers");
                self.phase.send_replace(Phase::Stopped);
                return Err(Failure::Signal(e).into());
            }
        };

        self.run_until(cancel, server, async move { listener.recv().await })
            .await
    }

    /// Run `server`, treating completion of `trigger` as a received signal.
    pub async fn run_until<S, F>(
        &self,
        cancel: &CancellationToken,
        server: &S,
        trigger: F,
    ) -> Result<(), LifecycleError>
    where
        S: Server,
        F: Future<Output = Signal>,
    {
        let token = cancel.child_token();
        self.phase.send_replace(Phase::Starting);

        let serve = async {
            let _guard = token.clone().drop_guard();
            if token.is_cancelled() {
                tracing::info!("start server: cancelled before start");
                return None;
            }

            self.phase.send_replace(Phase::Serving);
            tracing::info!(addr = %server.addr(), "server listen and serve");
            match server.serve().await {
                Ok(()) => None,
                Err(e) if e.is_closed() => None,
                Err(e) => {
                    tracing::error!(addr = %server.addr(), error = %e, "server listen and serve");
                    Some(Failure::Serve(e))
                }
            }
        };

        let stop = async {
            let _guard = token.clone().drop_guard();
            tokio::select! {
                _ = token.cancelled() => {}
                signal = trigger => {
                    tracing::warn!(signal = %signal, "received signal");
                }
            }

            self.phase.send_replace(Phase::ShuttingDown);
            let deadline = Instant::now() + self.grace_period;
            tracing::warn!(grace_period = ?self.grace_period, "shutting down server");

            let result = tokio::time::timeout_at(deadline, server.shutdown(deadline))
                .await
                .unwrap_or(Err(ShutdownError::DeadlineExceeded));
            let failure = match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::error!(error = %e, "server shutdown");
                    Some(Failure::Shutdown(e))
                }
            };
            tracing::warn!("shut down");
            failure
        };

        let (serve_failure, stop_failure) = tokio::join!(serve, stop);
        self.phase.send_replace(Phase::Stopped);

        match LifecycleError::join(serve_failure.into_iter().chain(stop_failure)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `server` until one of `signals` arrives or `cancel` fires, then shut
/// it down within [`DEFAULT_GRACE_PERIOD`].
pub async fn listen_and_serve<S: Server>(
    cancel: &CancellationToken,
    server: &S,
    signals: &[Signal],
) -> Result<(), LifecycleError> {
    Lifecycle::new()
        .with_signals(signals.iter().copied())
        .run(cancel, server)
        .await
}
