//! Test doubles shared by the workspace's test suites.

use async_trait::async_trait;
use ragbot_core::error::Result;
use ragbot_core::traits::{DocumentStore, EmbeddingProvider};
use ragbot_core::types::Document;
use std::sync::Arc;

use crate::store::VectorStore;

/// Deterministic embedder: one dimension per vocabulary word (its count in
/// the text) plus a constant bias so no text embeds to the zero vector.
pub struct KeywordEmbedder {
    name: String,
    vocabulary: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(words: &[&str]) -> Self {
        Self {
            name: format!("keyword-{}", words.len()),
            vocabulary: words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut v: Vec<f32> = self
            .vocabulary
            .iter()
            .map(|word| tokens.iter().filter(|t| *t == word).count() as f32)
            .collect();
        v.push(1.0);
        v
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new(&["paris", "lyon", "berlin", "capital", "city", "france", "germany"])
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Empty store in a fresh temp dir; keep the `TempDir` alive for the test.
pub async fn temp_store() -> (tempfile::TempDir, VectorStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = VectorStore::open(dir.path(), "test", Arc::new(KeywordEmbedder::default()))
        .await
        .expect("open store");
    (dir, store)
}

/// Temp store holding the two-document France fixture.
pub async fn france_store() -> (tempfile::TempDir, VectorStore) {
    let (dir, store) = temp_store().await;
    store
        .add(&[
            Document::new("doc1", "Paris is the capital of France."),
            Document::new("doc2", "Lyon is a city in France."),
        ])
        .await
        .expect("seed store");
    (dir, store)
}
