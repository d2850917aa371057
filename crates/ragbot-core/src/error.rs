//! Error types shared by every Ragbot crate.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RagbotError>;

#[derive(Debug, thiserror::Error)]
pub enum RagbotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to read documents file {}: {source}", path.display())]
    SourceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API key missing for provider '{0}'")]
    ApiKeyMissing(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagbotError {
    /// Shorthand for store-layer failures from foreign error types.
    pub fn store(e: impl std::fmt::Display) -> Self {
        Self::Store(e.to_string())
    }
}
