//! Mediagate API Library
//!
//! This crate provides the gateway's token service, auth middleware, router,
//! handlers and transport bootstrap.

mod api_doc;
mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
pub use setup::routes::{build_router, RouterOptions};
pub use state::{AppState, Deadlines, SessionCookie};
