//! # Ragbot Gateway
//!
//! Axum HTTP surface: `POST /ask`, `GET /health`, a credentialed CORS
//! allow-list, and startup wiring (store, provider, document bootstrap).

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, build_query_service, build_router, start};
