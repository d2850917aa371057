//! Unified OpenAI-compatible completion provider.
//!
//! One struct handles chat completions for every OpenAI-compatible API.
//! Providers differ only by endpoint URL, auth style, and API key.

use async_trait::async_trait;
use ragbot_core::config::LlmConfig;
use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::provider::{GenerateParams, Provider};
use ragbot_core::types::{Message, ProviderResponse, Usage};
use serde_json::{Value, json};

use crate::provider_registry::{AuthStyle, ProviderConfig};

/// A unified provider that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    /// Provider name (e.g., "gemini", "openai").
    name: String,
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    /// Path for chat completions (e.g., "/chat/completions").
    chat_path: String,
    auth_style: AuthStyle,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a known provider config.
    ///
    /// Resolution order:
    /// - API key: `config.api_key` > registry env vars > empty
    /// - Base URL: `config.endpoint` > env override > registry default
    pub fn from_registry(registry: &ProviderConfig, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            name: registry.name.to_string(),
            api_key: registry.resolve_api_key(&config.api_key),
            base_url: registry.resolve_base_url(&config.endpoint),
            chat_path: registry.chat_path.to_string(),
            auth_style: registry.auth_style,
            client: build_client(config.timeout_secs)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, config: &LlmConfig) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: "/chat/completions".to_string(),
            auth_style,
            client: build_client(config.timeout_secs)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        apply_auth(self.auth_style, &self.api_key, req)
    }
}

/// Shared HTTP client; `timeout_secs == 0` keeps reqwest's defaults.
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(std::time::Duration::from_secs(timeout_secs));
    }
    builder
        .build()
        .map_err(|e| RagbotError::Http(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn apply_auth(
    style: AuthStyle,
    api_key: &str,
    req: reqwest::RequestBuilder,
) -> reqwest::RequestBuilder {
    match style {
        AuthStyle::Bearer if !api_key.is_empty() => {
            req.header("Authorization", format!("Bearer {api_key}"))
        }
        _ => req,
    }
}

/// Parse a standard OpenAI chat-completions response body.
pub fn parse_completion(provider: &str, json: &Value) -> Result<ProviderResponse> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| RagbotError::Provider(format!("{provider}: no choices in response")))?;

    let usage = json["usage"].as_object().map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    });

    Ok(ProviderResponse {
        content: choice["message"]["content"].as_str().map(String::from),
        finish_reason: choice["finish_reason"].as_str().map(String::from),
        usage,
    })
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerateParams,
    ) -> Result<ProviderResponse> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(RagbotError::ApiKeyMissing(self.name.clone()));
        }

        let body = json!({
            "model": params.model,
            "messages": messages,
        });

        let url = format!("{}{}", self.base_url, self.chat_path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            RagbotError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RagbotError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| RagbotError::Http(format!("{}: malformed response: {e}", self.name)))?;

        let parsed = parse_completion(&self.name, &json)?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                "{} usage: prompt={} completion={} total={}",
                self.name,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        Ok(parsed)
    }

    async fn health_check(&self) -> Result<bool> {
        if self.auth_style != AuthStyle::None {
            // Cloud providers: just check that a key is set
            return Ok(!self.api_key.is_empty());
        }
        // Local servers: try to connect
        let resp = self.client.get(&self.base_url).send().await;
        Ok(resp.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider_registry::get_provider_config;
    use axum::http::{HeaderMap, StatusCode};
    use axum::{Json, Router, routing::post};

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Echoes auth header, model and the first message back as the completion.
    async fn echo_chat(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let model = body["model"].as_str().unwrap_or("").to_string();
        let content = body["messages"][0]["content"].as_str().unwrap_or("").to_string();
        let role = body["messages"][0]["role"].as_str().unwrap_or("").to_string();
        Json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": format!("{auth}|{model}|{role}|{content}")},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
        }))
    }

    fn provider_for(base: &str, api_key: &str) -> OpenAiCompatibleProvider {
        let config = LlmConfig {
            provider: "openai".into(),
            api_key: api_key.into(),
            endpoint: base.into(),
            ..LlmConfig::default()
        };
        OpenAiCompatibleProvider::from_registry(get_provider_config("openai").unwrap(), &config)
            .unwrap()
    }

    #[test]
    fn test_parse_completion() {
        let json = json!({
            "choices": [{"message": {"content": "Paris."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14}
        });
        let resp = parse_completion("gemini", &json).unwrap();
        assert_eq!(resp.content.as_deref(), Some("Paris."));
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.unwrap().total_tokens, 14);
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let err = parse_completion("gemini", &json!({"error": "quota"})).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_custom_endpoint() {
        let config = LlmConfig {
            api_key: "k".into(),
            ..LlmConfig::default()
        };
        let p = OpenAiCompatibleProvider::custom("custom:http://10.0.0.5:8000/v1/", &config)
            .unwrap();
        assert_eq!(p.name(), "custom");
        assert_eq!(p.base_url(), "http://10.0.0.5:8000/v1");
    }

    #[tokio::test]
    async fn test_chat_sends_model_prompt_and_bearer() {
        let base = spawn_mock(Router::new().route("/chat/completions", post(echo_chat))).await;
        let provider = provider_for(&base, "sk-test");

        let resp = provider
            .chat(&[Message::user("hello")], &GenerateParams::new("gpt-4o-mini"))
            .await
            .unwrap();

        assert_eq!(
            resp.content.as_deref(),
            Some("Bearer sk-test|gpt-4o-mini|user|hello")
        );
        assert_eq!(resp.usage.unwrap().prompt_tokens, 7);
    }

    #[tokio::test]
    async fn test_chat_error_status_carries_body() {
        async fn quota() -> (StatusCode, &'static str) {
            (StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
        }
        let base = spawn_mock(Router::new().route("/chat/completions", post(quota))).await;
        let provider = provider_for(&base, "sk-test");

        let err = provider
            .chat(&[Message::user("hi")], &GenerateParams::new("m"))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"), "{msg}");
        assert!(msg.contains("quota exceeded"), "{msg}");
    }

    #[tokio::test]
    async fn test_chat_connection_failure() {
        // bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = provider_for(&format!("http://{addr}"), "sk-test");
        let err = provider
            .chat(&[Message::user("hi")], &GenerateParams::new("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagbotError::Http(_)));
    }

    #[tokio::test]
    async fn test_chat_without_key_fails_fast() {
        let config = LlmConfig {
            provider: "openai".into(),
            api_key: String::new(),
            endpoint: "http://127.0.0.1:9".into(),
            ..LlmConfig::default()
        };
        let mut provider =
            OpenAiCompatibleProvider::from_registry(get_provider_config("openai").unwrap(), &config)
                .unwrap();
        // env may carry a real key on dev machines
        provider.api_key.clear();

        let err = provider
            .chat(&[Message::user("hi")], &GenerateParams::new("m"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagbotError::ApiKeyMissing(ref n) if n == "openai"));
        assert!(!provider.health_check().await.unwrap());
    }
}
