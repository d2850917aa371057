//! Completion provider trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Message, ProviderResponse};

/// Per-request generation parameters.
///
/// Only the model id is sent; sampling settings are left to the provider's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateParams {
    pub model: String,
}

impl GenerateParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/// A hosted text-generation backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send one non-streaming chat completion request.
    async fn chat(&self, messages: &[Message], params: &GenerateParams)
    -> Result<ProviderResponse>;

    /// Cheap readiness check. Cloud providers only report whether a key is configured.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
