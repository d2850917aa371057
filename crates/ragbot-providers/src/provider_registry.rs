//! Provider registry — maps provider names to endpoint configurations.
//!
//! All OpenAI-compatible providers are defined here as static config entries.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// No authentication required (local servers).
    None,
}

/// Configuration for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API.
    pub base_url: &'static str,
    /// Path for chat completions endpoint (appended to base_url).
    pub chat_path: &'static str,
    /// Path for the embeddings endpoint, if the provider has one.
    pub embeddings_path: Option<&'static str>,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    /// How to send auth credentials.
    pub auth_style: AuthStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
}

impl ProviderConfig {
    /// Resolve the API key: explicit value > env vars > empty.
    pub fn resolve_api_key(&self, explicit: &str) -> String {
        if !explicit.is_empty() {
            return explicit.to_string();
        }
        self.env_keys
            .iter()
            .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
            .unwrap_or_default()
    }

    /// Resolve the base URL: explicit endpoint > env override > registry default.
    pub fn resolve_base_url(&self, explicit: &str) -> String {
        if !explicit.is_empty() {
            return explicit.trim_end_matches('/').to_string();
        }
        self.base_url_env
            .and_then(|env_key| {
                let val = std::env::var(env_key).ok()?;
                // OLLAMA_HOST and friends are usually given without /v1
                if val.ends_with("/v1") {
                    Some(val)
                } else {
                    Some(format!("{}/v1", val.trim_end_matches('/')))
                }
            })
            .unwrap_or_else(|| self.base_url.to_string())
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// All known providers.
static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
        chat_path: "/chat/completions",
        embeddings_path: Some("/embeddings"),
        env_keys: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        chat_path: "/chat/completions",
        embeddings_path: Some("/embeddings"),
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: Some("OPENAI_API_BASE"),
    },
    ProviderConfig {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        chat_path: "/chat/completions",
        embeddings_path: None,
        env_keys: &["OPENROUTER_API_KEY", "OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "deepseek",
        base_url: "https://api.deepseek.com",
        chat_path: "/chat/completions",
        embeddings_path: None,
        env_keys: &["DEEPSEEK_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        chat_path: "/chat/completions",
        embeddings_path: None,
        env_keys: &["GROQ_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "mistral",
        base_url: "https://api.mistral.ai/v1",
        chat_path: "/chat/completions",
        embeddings_path: Some("/embeddings"),
        env_keys: &["MISTRAL_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
    },
    ProviderConfig {
        name: "ollama",
        base_url: "http://localhost:11434/v1",
        chat_path: "/chat/completions",
        embeddings_path: Some("/embeddings"),
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("OLLAMA_HOST"),
    },
    ProviderConfig {
        name: "llamacpp",
        base_url: "http://localhost:8080/v1",
        chat_path: "/chat/completions",
        embeddings_path: Some("/embeddings"),
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("LLAMACPP_HOST"),
    },
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "google" | "google-genai" => "gemini",
        "llama.cpp" => "llamacpp",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
