//! The server contract the lifecycle coordinator drives.
//!
//! # Responsibilities
//! - Expose a blocking serve loop that ends with a close sentinel
//! - Expose a deadline-bounded shutdown
//! - Report the address for logging

use std::future::Future;

use thiserror::Error;
use tokio::time::Instant;

/// Errors returned by [`Server::serve`].
#[derive(Debug, Error)]
pub enum ServeError {
    /// The server was deliberately shut down. Not a failure.
    #[error("server closed")]
    Closed,

    /// `serve` was called while a previous call is still running.
    #[error("server already started")]
    AlreadyStarted,

    /// Failed to bind the listen address.
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("serve: {0}")]
    Io(#[from] std::io::Error),
}

impl ServeError {
    /// Returns true for the close sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, ServeError::Closed)
    }
}

/// Errors returned by [`Server::shutdown`].
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// In-flight work did not finish before the deadline.
    #[error("shutdown deadline exceeded")]
    DeadlineExceeded,

    /// Any other shutdown failure.
    #[error("shutdown failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A server that can be started once and stopped once.
///
/// `serve` and `shutdown` are invoked concurrently from the same borrowed
/// value, so implementations synchronize internally.
pub trait Server: Send + Sync {
    /// Address used in log output.
    fn addr(&self) -> String;

    /// Run the accept loop until the server stops.
    ///
    /// Returns `Ok(())` or [`ServeError::Closed`] after a graceful stop.
    fn serve(&self) -> impl Future<Output = Result<(), ServeError>> + Send;

    /// Stop accepting and wait for in-flight work until `deadline`.
    fn shutdown(&self, deadline: Instant) -> impl Future<Output = Result<(), ShutdownError>> + Send;
}
