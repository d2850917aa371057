//! Ragbot configuration system.
//!
//! Resolution order: TOML file (if present) → `RAGBOT_*` environment
//! overrides → CLI flags (applied by the binary). Credentials are never
//! given a literal default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RagbotError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagbotConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl RagbotConfig {
    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagbotError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RagbotError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path (~/.ragbot/config.toml).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ragbot")
            .join("config.toml")
    }

    /// Apply `RAGBOT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("RAGBOT_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("RAGBOT_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = get("RAGBOT_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("RAGBOT_STORE_PATH") {
            self.store.path = v;
        }
        if let Some(v) = get("RAGBOT_DOCUMENTS") {
            self.store.documents_path = v;
        }
        if let Some(v) = get("RAGBOT_HOST") {
            self.gateway.host = v;
        }
        if let Some(v) = get("RAGBOT_PORT") {
            self.gateway.port = v
                .trim()
                .parse()
                .map_err(|e| RagbotError::Config(format!("Invalid RAGBOT_PORT '{v}': {e}")))?;
        }
        if let Some(v) = get("RAGBOT_CORS_ORIGINS") {
            self.gateway.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }
}

/// Mask a secret for display: first 4 chars + ••••
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    match s.char_indices().nth(4) {
        Some((idx, _)) => format!("{}••••", &s[..idx]),
        None => "••••".to_string(),
    }
}

/// Completion provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Empty means "look up the provider's env keys".
    #[serde(default)]
    pub api_key: String,
    /// Empty means "use the registry base URL".
    #[serde(default)]
    pub endpoint: String,
    /// HTTP timeout in seconds; 0 keeps the client default.
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_provider() -> String { "gemini".into() }
fn default_model() -> String { "gemini-2.0-flash".into() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: 0,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &mask_secret(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `"local"` runs a sentence-transformers model in-process; otherwise a provider registry name.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Hugging Face model id (local) or the provider's embedding model.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Width of the vectors the model produces.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Max inputs per remote `/embeddings` request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_provider() -> String { "local".into() }
fn default_embedding_model() -> String { "sentence-transformers/all-MiniLM-L6-v2".into() }
fn default_dimensions() -> usize { 384 }
fn default_batch_size() -> usize { 100 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
        }
    }
}

/// Vector store and source document configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// LanceDB directory.
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_documents_path")]
    pub documents_path: String,
}

fn default_store_path() -> String { "./ragbot_db".into() }
fn default_collection() -> String { "rag_collection".into() }
fn default_documents_path() -> String { "documents.txt".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            documents_path: default_documents_path(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Origins allowed to call the API with credentials.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 { 8000 }
fn default_host() -> String { "127.0.0.1".into() }
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000", "https://your-deployed-frontend.com"]
        .into_iter().map(String::from).collect()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RagbotConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.store.collection, "rag_collection");
        assert_eq!(config.store.documents_path, "documents.txt");
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.embedding.model, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(config.embedding.batch_size, 100);
        assert_eq!(config.store.path, "./ragbot_db");
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.cors_origins.len(), 2);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [llm]
            provider = "openai"
            model = "gpt-4o-mini"

            [store]
            path = "/var/lib/ragbot/db"

            [gateway]
            port = 9090
            cors_origins = ["https://example.com"]
        "#;

        let config: RagbotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.store.path, "/var/lib/ragbot/db");
        assert_eq!(config.store.collection, "rag_collection");
        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.gateway.cors_origins, vec!["https://example.com"]);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: RagbotConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.embedding.dimensions, 384);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("ragbot-test-does-not-exist.toml");
        let config = RagbotConfig::load(&path).unwrap();
        assert_eq!(config.llm.provider, "gemini");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("RAGBOT_API_KEY", "sk-test-key"),
            ("RAGBOT_MODEL", "gemini-2.5-flash"),
            ("RAGBOT_PORT", "8181"),
            ("RAGBOT_CORS_ORIGINS", "https://a.example, https://b.example ,"),
            ("RAGBOT_DOCUMENTS", ""),
        ]
        .into_iter()
        .collect();

        let mut config = RagbotConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-test-key");
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.gateway.port, 8181);
        assert_eq!(
            config.gateway.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        // empty values don't clobber
        assert_eq!(config.store.documents_path, "documents.txt");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = RagbotConfig::default();
        let err = config
            .apply_overrides(|k| (k == "RAGBOT_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, RagbotError::Config(_)));
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut config = RagbotConfig::default();
        config.llm.api_key = "AIzaSecretValue".into();
        let dbg = format!("{:?}", config.llm);
        assert!(!dbg.contains("SecretValue"));
        assert!(dbg.contains("AIza••••"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "••••");
        assert_eq!(mask_secret("abcd"), "••••");
        assert_eq!(mask_secret("abcdef"), "abcd••••");
    }
}
