//! # Ragbot Core
//!
//! Shared building blocks for the Ragbot workspace:
//! configuration, the crate-wide error type, plain data types and the
//! collaborator traits (`Provider`, `EmbeddingProvider`, `DocumentStore`)
//! that the query service is wired against.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RagbotConfig;
pub use error::{RagbotError, Result};
pub use traits::{DocumentStore, EmbeddingProvider, Provider};
pub use types::{Document, SearchResult};
