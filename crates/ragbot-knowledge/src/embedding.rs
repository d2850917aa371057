//! Local sentence-transformers embeddings via `embed_anything`.
//!
//! The default model is all-MiniLM-L6-v2 (384 dims), the same model most
//! vector databases ship as their default embedding function.

use async_trait::async_trait;
use embed_anything::embed_query;
use embed_anything::embeddings::embed::{Embedder, TextEmbedder};
use embed_anything::embeddings::local::bert::BertEmbedder;
use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::EmbeddingProvider;

pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// BERT-family sentence embedder running in-process.
///
/// Weights are fetched from the Hugging Face hub on first load and cached
/// under `HF_HOME` (default `~/.cache/huggingface`).
pub struct LocalEmbedder {
    model: String,
    dimensions: usize,
    embedder: Embedder,
}

impl LocalEmbedder {
    /// Load `model`. Blocks while weights download; call off the async runtime.
    pub fn load(model: &str, dimensions: usize) -> Result<Self> {
        let bert = BertEmbedder::new(model.to_string(), None, None)
            .map_err(|e| RagbotError::Embedding(format!("Failed to load model {model}: {e}")))?;
        tracing::info!("🧠 Loaded local embedding model {model}");

        Ok(Self {
            model: model.to_string(),
            dimensions,
            embedder: Embedder::Text(TextEmbedder::Bert(Box::new(bert))),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embedded = embed_query(&refs, &self.embedder, None)
            .await
            .map_err(|e| RagbotError::Embedding(format!("{}: {e}", self.model)))?;

        let vectors = embedded
            .into_iter()
            .map(|data| {
                data.embedding
                    .to_dense()
                    .map_err(|e| RagbotError::Embedding(format!("{}: {e}", self.model)))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(v) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagbotError::Embedding(format!(
                "{} produced {}-dim vectors; set [embedding] dimensions = {}",
                self.model,
                v.len(),
                v.len()
            )));
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[tokio::test]
    #[ignore] // Downloads all-MiniLM-L6-v2 from the Hugging Face hub
    async fn test_minilm_captures_synonyms() {
        let e = LocalEmbedder::load(DEFAULT_LOCAL_MODEL, 384).unwrap();
        let v = e
            .embed_batch(&["car".into(), "automobile".into(), "banana".into()])
            .await
            .unwrap();

        assert_eq!(v.len(), 3);
        assert!(v.iter().all(|x| x.len() == 384));
        assert!(cosine(&v[0], &v[1]) > 0.5);
        assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
    }

    #[tokio::test]
    #[ignore] // Downloads all-MiniLM-L6-v2 from the Hugging Face hub
    async fn test_wrong_declared_dimensions() {
        let e = LocalEmbedder::load(DEFAULT_LOCAL_MODEL, 768).unwrap();
        let err = e.embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("dimensions = 384"), "{err}");
    }
}
