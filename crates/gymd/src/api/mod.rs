//! HTTP API module.
//!
//! REST endpoints for creating, stepping and deleting environment sessions.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::{AppState, CorsState};
