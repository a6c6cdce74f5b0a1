//! Zobot API crate - axum HTTP server and route handlers.
//!
//! Serves the chat endpoint the widget calls, plus the simulated upload,
//! legacy monitor, session inspection and health endpoints.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
