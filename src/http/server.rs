//! HTTP server setup and graceful stop.
//!
//! # Responsibilities
//! - Wrap an Axum Router with tracing and timeout middleware
//! - Bind the listener when serving starts (bind failure is a start failure)
//! - Stop accepting on shutdown and wait for in-flight requests
//! - Give up on stragglers once the shutdown deadline passes
//!
//! # State Machine
//! ```text
//! Idle ──serve──▶ Serving ──drained──▶ Stopped
//!   │                 └────deadline───▶ Abandoned
//!   └──shutdown──▶ Stopped
//! ```

use std::future::IntoFuture;
use std::sync::Mutex;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::lifecycle::{ServeError, Server, ShutdownError};

/// Where the server is in its single start/stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not started.
    Idle,
    /// Accept loop running.
    Serving,
    /// Stopped with every connection drained, or never started.
    Stopped,
    /// Stopped at the shutdown deadline with connections still open.
    Abandoned,
}

/// An Axum server that can be started once and stopped once.
pub struct HttpServer {
    addr: String,
    router: Router,
    listener: Mutex<Option<TcpListener>>,
    /// Cancelled when shutdown begins; stops the accept loop.
    stop: CancellationToken,
    /// Set when shutdown begins; bounds how long serve waits for connections.
    deadline: watch::Sender<Option<Instant>>,
    state: watch::Sender<ServerState>,
}

impl HttpServer {
    /// Create a server that binds `config.bind_address` when it starts serving.
    pub fn new(config: &ServerConfig, router: Router) -> Self {
        Self::build(config.bind_address.clone(), None, config, router)
    }

    /// Create a server on an already-bound listener.
    pub fn with_listener(
        listener: TcpListener,
        config: &ServerConfig,
        router: Router,
    ) -> Result<Self, std::io::Error> {
        let addr = listener.local_addr()?.to_string();
        Ok(Self::build(addr, Some(listener), config, router))
    }

    fn build(
        addr: String,
        listener: Option<TcpListener>,
        config: &ServerConfig,
        router: Router,
    ) -> Self {
        let (deadline, _) = watch::channel(None);
        let (state, _) = watch::channel(ServerState::Idle);
        Self {
            addr,
            router: Self::build_router(config, router),
            listener: Mutex::new(listener),
            stop: CancellationToken::new(),
            deadline,
            state,
        }
    }

    /// Apply the shared middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, router: Router) -> Router {
        router
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(TraceLayer::new_for_http())
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    fn take_listener(&self) -> Option<TcpListener> {
        self.listener.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Resolves once the shutdown deadline has been set and has passed.
    async fn deadline_passed(&self) {
        let mut rx = self.deadline.subscribe();
        let deadline = rx.wait_for(Option::is_some).await.ok().and_then(|d| *d);
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

impl Server for HttpServer {
    fn addr(&self) -> String {
        self.addr.clone()
    }

    async fn serve(&self) -> Result<(), ServeError> {
        if self.stop.is_cancelled() {
            return Err(ServeError::Closed);
        }
        let started = self.state.send_if_modified(|state| {
            if *state == ServerState::Idle {
                *state = ServerState::Serving;
                true
            } else {
                false
            }
        });
        if !started {
            let state = *self.state.borrow();
            return Err(match state {
                ServerState::Serving => ServeError::AlreadyStarted,
                _ => ServeError::Closed,
            });
        }

        let listener = match self.take_listener() {
            Some(listener) => listener,
            None => match TcpListener::bind(&self.addr).await {
                Ok(listener) => listener,
                Err(source) => {
                    self.state.send_replace(ServerState::Stopped);
                    return Err(ServeError::Bind {
                        addr: self.addr.clone(),
                        source,
                    });
                }
            },
        };

        tracing::info!(address = %self.addr, "HTTP server starting");

        let stop = self.stop.clone();
        let serving = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .into_future();

        let (result, state) = tokio::select! {
            result = serving => (result, ServerState::Stopped),
            _ = self.deadline_passed() => {
                tracing::warn!(address = %self.addr, "Abandoning connections still open at shutdown deadline");
                (Ok(()), ServerState::Abandoned)
            }
        };
        self.state.send_replace(state);

        match result {
            Ok(()) => {
                tracing::info!(address = %self.addr, "HTTP server stopped");
                Err(ServeError::Closed)
            }
            Err(e) => Err(ServeError::Io(e)),
        }
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError> {
        self.deadline.send_replace(Some(deadline));
        self.stop.cancel();

        let never_started = self.state.send_if_modified(|state| {
            if *state == ServerState::Idle {
                *state = ServerState::Stopped;
                true
            } else {
                false
            }
        });
        if never_started {
            return Ok(());
        }

        let mut rx = self.state.subscribe();
        let finished = tokio::time::timeout_at(
            deadline,
            rx.wait_for(|state| matches!(state, ServerState::Stopped | ServerState::Abandoned)),
        )
        .await
        .is_ok();

        if finished && self.state() == ServerState::Stopped {
            Ok(())
        } else {
            Err(ShutdownError::DeadlineExceeded)
        }
    }
}
