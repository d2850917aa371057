//! Collaborator traits the query service is wired against.

pub mod embedding;
pub mod provider;
pub mod store;

pub use embedding::EmbeddingProvider;
pub use provider::Provider;
pub use store::DocumentStore;
