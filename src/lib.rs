//! Graceful HTTP helpers
//!
//! - `lifecycle`: run a server until a signal, cancellation, or failure,
//!   then shut it down within a bounded grace period
//! - `http`: JSON request/response helpers, wrong-status errors, and an
//!   Axum-backed server for the lifecycle

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::Config;
pub use http::{HttpError, HttpServer, WrongStatusError};
pub use lifecycle::{listen_and_serve, Lifecycle, LifecycleError, Signal};
