//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Run (coordinator.rs):
//!     Register signals → Serve ──┐
//!                                ├─▶ Shutdown (bounded) → Join → Result
//!     Signal / cancel / failure ─┘
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/... → Stop decision
//!
//! Server contract (server.rs):
//!     serve() until closed, shutdown(deadline)
//! ```
//!
//! # Design Decisions
//! - One run per call; nothing global survives the run
//! - Shutdown has timeout: the run always finishes
//! - Failures from both paths are merged, never dropped

pub mod coordinator;
pub mod error;
pub mod server;
pub mod signals;

pub use coordinator::{listen_and_serve, Lifecycle, Phase, DEFAULT_GRACE_PERIOD};
pub use error::{Failure, LifecycleError};
pub use server::{ServeError, Server, ShutdownError};
pub use signals::{Signal, SignalListener};
