//! Operations REST API for the relief core.
//!
//! This crate exposes the five relief components over Axum HTTP with JSON
//! bodies. Field clients and dashboards call it; authentication happens
//! upstream and the caller names the operator in `x-operator-id`.
//!
//! Errors share one body shape, `{"error", "kind", "status"}`; see
//! [`ApiError`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServeError, start_server};
pub use state::AppState;
