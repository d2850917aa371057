//! Document store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Document, SearchResult};

/// A persistent collection of embedded documents, queryable by similarity.
///
/// Embedding and ranking are the store's concern; callers only hand over text.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &str;

    /// Number of documents currently stored.
    async fn count(&self) -> Result<usize>;

    /// Insert all documents in one operation. Either every document lands or none do.
    async fn add(&self, documents: &[Document]) -> Result<()>;

    /// Up to `top_k` documents most similar to `text`, best first.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>>;
}
