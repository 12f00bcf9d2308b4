//! HTTP surface over the scandoc pipeline.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use server::{serve, ServerError};
pub use state::AppState;
