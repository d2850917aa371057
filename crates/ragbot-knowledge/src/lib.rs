//! # Ragbot Knowledge
//!
//! The document side of the RAG pipeline.
//!
//! ## Design
//! - **LanceDB** directory holds one table per collection; nearest-neighbour
//!   search (cosine distance) is LanceDB's
//! - **all-MiniLM-L6-v2** via `embed_anything` as the default embedding
//!   function; remote embedders plug in through `EmbeddingProvider`
//! - **One-shot loader** that seeds an empty store from a line-per-document file
//!
//! ```text
//! documents.txt ──load_documents──▶ VectorStore (ragbot_db/)
//!                                        │
//! question ──embed──▶ vector_search ◀────┘
//! ```

pub mod embedding;
pub mod loader;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use embedding::{DEFAULT_LOCAL_MODEL, LocalEmbedder};
pub use loader::{LoadOutcome, load_documents, parse_documents};
pub use store::VectorStore;
