//! Embedding provider trait.

use async_trait::async_trait;

use crate::error::{RagbotError, Result};

/// Turns text into fixed-width vectors for similarity search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier recorded alongside stored vectors.
    fn name(&self) -> &str;

    /// Width of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed many texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagbotError::Embedding(format!("{} returned no embedding", self.name())))
    }
}
