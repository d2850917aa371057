//! # Ragbot Providers
//!
//! Clients for hosted model APIs. Every supported backend speaks the
//! OpenAI wire format (Gemini through its `/v1beta/openai` surface), so a
//! single `OpenAiCompatibleProvider` covers completions and a single
//! `RemoteEmbedder` covers embeddings. Backends differ only by base URL,
//! auth style and the env vars their key is read from.

pub mod embeddings;
pub mod openai_compatible;
pub mod provider_registry;

use ragbot_core::config::{EmbeddingConfig, LlmConfig};
use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::{EmbeddingProvider, Provider};

/// Create the completion provider named by `config.provider`.
///
/// `"custom:https://host/v1"` targets an arbitrary OpenAI-compatible server.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn Provider>> {
    let name = config.provider.as_str();
    if name.starts_with("custom:") {
        return Ok(Box::new(openai_compatible::OpenAiCompatibleProvider::custom(
            name, config,
        )?));
    }

    let registry =
        provider_registry::get_provider_config(name).ok_or_else(|| not_found(name))?;
    Ok(Box::new(
        openai_compatible::OpenAiCompatibleProvider::from_registry(registry, config)?,
    ))
}

fn not_found(name: &str) -> RagbotError {
    RagbotError::ProviderNotFound(format!(
        "{name} (available: {}, custom:<url>)",
        provider_registry::all_provider_names().join(", ")
    ))
}

/// Create a remote embedder for `config.provider`.
///
/// Reuses the completion key when both point at the same provider.
pub fn create_embedder(
    config: &EmbeddingConfig,
    llm: &LlmConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    let registry = provider_registry::get_provider_config(&config.provider)
        .ok_or_else(|| not_found(&config.provider))?;

    let shared_key = provider_registry::get_provider_config(&llm.provider)
        .is_some_and(|p| p.name == registry.name);
    let api_key = if shared_key { llm.api_key.as_str() } else { "" };

    Ok(Box::new(embeddings::RemoteEmbedder::from_registry(
        registry,
        &config.model,
        config.dimensions,
        api_key,
        llm.timeout_secs,
    )?
    .with_batch_size(config.batch_size)))
}
