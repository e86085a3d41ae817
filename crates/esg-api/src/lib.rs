//! ESG assistant API crate - axum HTTP server and route handlers.
//!
//! Exposes the question index, session management and the chat turn
//! endpoint to a browser UI.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
