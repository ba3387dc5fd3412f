//! HTTP helpers subsystem.
//!
//! # Data Flow
//! ```text
//! Client side:
//!     request.rs (new_request, join_url)
//!     → response.rs (send → Exchange)
//!     → error_for_status → WrongStatusError | json::<T>()
//!
//! Server side:
//!     server.rs (Axum setup, graceful stop)
//!     → handlers decode bodies with request.rs (decode_request)
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::{DecodeError, HttpError, WrongStatusError};
pub use request::{
    decode, decode_request, join_url, new_empty_request, new_request, new_request_with_timeout,
};
pub use response::{send, Exchange};
pub use server::{HttpServer, ServerState};
