//! OpenAI-compatible embeddings client.

use async_trait::async_trait;
use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::EmbeddingProvider;
use serde::{Deserialize, Serialize};

use crate::openai_compatible::{apply_auth, build_client};
use crate::provider_registry::{AuthStyle, ProviderConfig};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embeds text through a provider's `/embeddings` endpoint.
pub struct RemoteEmbedder {
    name: String,
    provider: String,
    model: String,
    dimensions: usize,
    api_key: String,
    url: String,
    auth_style: AuthStyle,
    batch_size: usize,
    client: reqwest::Client,
}

/// Inputs per request unless overridden; under every hosted provider's cap.
pub const DEFAULT_BATCH_SIZE: usize = 100;

impl RemoteEmbedder {
    /// `dimensions` is the declared vector width; responses of any other width are rejected.
    pub fn from_registry(
        registry: &ProviderConfig,
        model: &str,
        dimensions: usize,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let path = registry.embeddings_path.ok_or_else(|| {
            RagbotError::Config(format!(
                "provider '{}' has no embeddings endpoint",
                registry.name
            ))
        })?;

        Ok(Self {
            name: format!("{}/{}", registry.name, model),
            provider: registry.name.to_string(),
            model: model.to_string(),
            dimensions,
            api_key: registry.resolve_api_key(api_key),
            url: format!("{}{}", registry.resolve_base_url(""), path),
            auth_style: registry.auth_style,
            batch_size: DEFAULT_BATCH_SIZE,
            client: build_client(timeout_secs)?,
        })
    }

    /// Split larger inputs into requests of at most `n` texts.
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    /// Point at a different server (tests, proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// One `/embeddings` call; vectors come back in input order.
    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request);
        let resp = apply_auth(self.auth_style, &self.api_key, req)
            .send()
            .await
            .map_err(|e| RagbotError::Embedding(format!("{} request failed: {e}", self.name)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RagbotError::Embedding(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let mut parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
            RagbotError::Embedding(format!("{}: malformed response: {e}", self.name))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(RagbotError::Embedding(format!(
                "{} returned {} embeddings for {} inputs",
                self.name,
                parsed.data.len(),
                texts.len()
            )));
        }
        // providers may reorder; `index` is authoritative when present
        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagbotError::Embedding(format!(
                "{} returned {}-dim vectors; set [embedding] dimensions = {}",
                self.name,
                v.len(),
                v.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(RagbotError::ApiKeyMissing(self.provider.clone()));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            vectors.extend(self.request(chunk).await?);
        }
        tracing::debug!(
            "{} embedded {} text(s) in {} request(s)",
            self.name,
            texts.len(),
            texts.len().div_ceil(self.batch_size)
        );
        Ok(vectors)
    }
}
