//! # Ragbot Agent
//! The query service: retrieve context from the document store, wrap it in
//! the prompt template, and ask the completion provider.
//!
//! Store and provider are injected at construction and shared read-only
//! across requests; the service holds no per-request state.

pub mod prompt;

use ragbot_core::error::RagbotError;
use ragbot_core::traits::provider::GenerateParams;
use ragbot_core::traits::{DocumentStore, Provider};
use ragbot_core::types::Message;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result count used when the caller doesn't specify one.
pub const DEFAULT_TOP_K: i64 = 5;

/// Generated answer plus the raw document texts it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Why an `ask` failed, by pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Retrieval(#[source] RagbotError),
    #[error("{0}")]
    Generation(#[source] RagbotError),
}

impl AskError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Retrieval(_) => "retrieval_error",
            Self::Generation(_) => "generation_error",
        }
    }
}

pub struct QueryService {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn Provider>,
    params: GenerateParams,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            params: GenerateParams::new(model),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.params.model
    }

    /// Answer `question` from the `top_k` most similar documents.
    ///
    /// The question is not validated; an empty string is searched as-is.
    /// `top_k` has no upper bound, but must not be negative.
    pub async fn ask(&self, question: &str, top_k: i64) -> Result<Answer, AskError> {
        let top_k = usize::try_from(top_k)
            .map_err(|_| AskError::Validation(format!("top_k must be >= 0, got {top_k}")))?;

        let results = self
            .store
            .query(question, top_k)
            .await
            .map_err(AskError::Retrieval)?;
        tracing::debug!(
            "Retrieved {} of {} requested document(s){}",
            results.len(),
            top_k,
            results
                .first()
                .map(|r| format!(" (best score {:.3})", r.score))
                .unwrap_or_default()
        );

        let sources: Vec<String> = results.into_iter().map(|r| r.document.text).collect();
        let prompt = prompt::build_prompt(&prompt::build_context(&sources), question);
        tracing::debug!("Prompt: {} chars", prompt.len());

        let response = self
            .provider
            .chat(&[Message::user(prompt)], &self.params)
            .await
            .map_err(AskError::Generation)?;

        let answer = response.content.ok_or_else(|| {
            AskError::Generation(RagbotError::Provider(format!(
                "{} returned no text (finish_reason: {})",
                self.provider.name(),
                response.finish_reason.as_deref().unwrap_or("unknown")
            )))
        })?;

        Ok(Answer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragbot_core::error::Result;
    use ragbot_core::types::{Document, ProviderResponse, SearchResult};
    use ragbot_knowledge::testing;
    use std::sync::Mutex;

    /// Records every prompt; replies with a fixed answer or fails.
    struct FakeProvider {
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
        fail: bool,
    }

    impl FakeProvider {
        fn answering(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Some(reply.to_string()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: None,
                fail: true,
            })
        }

        fn silent() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: None,
                fail: false,
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn chat(
            &self,
            messages: &[Message],
            params: &GenerateParams,
        ) -> Result<ProviderResponse> {
            assert_eq!(messages.len(), 1);
            assert_eq!(params.model, "test-model");
            self.prompts.lock().unwrap().push(messages[0].content.clone());
            if self.fail {
                return Err(RagbotError::Provider("quota exceeded".into()));
            }
            Ok(ProviderResponse {
                content: self.reply.clone(),
                finish_reason: Some("stop".into()),
                usage: None,
            })
        }
    }

    /// Store that records queries and returns canned results or fails.
    struct ScriptedStore {
        queries: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentStore for ScriptedStore {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }

        async fn add(&self, _documents: &[Document]) -> Result<()> {
            Ok(())
        }

        async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
            self.queries.lock().unwrap().push((text.to_string(), top_k));
            if self.fail {
                return Err(RagbotError::Store("database is locked".into()));
            }
            Ok(Vec::new())
        }
    }

    async fn france_store() -> (tempfile::TempDir, Arc<dyn DocumentStore>) {
        let (dir, store) = testing::france_store().await;
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn test_ask_capital_of_france() {
        let provider = FakeProvider::answering("Paris.");
        let (_dir, store) = france_store().await;
        let service = QueryService::new(store, provider.clone(), "test-model");

        let answer = service.ask("What is the capital of France?", 1).await.unwrap();
        assert_eq!(answer.answer, "Paris.");
        assert_eq!(answer.sources, vec!["Paris is the capital of France."]);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(
            prompts[0],
            prompt::build_prompt("Paris is the capital of France.", "What is the capital of France?")
        );
    }

    #[tokio::test]
    async fn test_ask_top_k_zero_sends_empty_context() {
        let provider = FakeProvider::answering("I don't know.");
        let (_dir, store) = france_store().await;
        let service = QueryService::new(store, provider.clone(), "test-model");

        let answer = service.ask("anything", 0).await.unwrap();
        assert!(answer.sources.is_empty());
        assert!(provider.prompts()[0].starts_with("Context: \n\nQuestion: anything"));
    }

    #[tokio::test]
    async fn test_ask_more_than_stored() {
        let provider = FakeProvider::answering("ok");
        let (_dir, store) = france_store().await;
        let service = QueryService::new(store, provider, "test-model");

        let answer = service.ask("France", 10).await.unwrap();
        assert_eq!(answer.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_question_reaches_store() {
        let store = Arc::new(ScriptedStore {
            queries: Mutex::new(Vec::new()),
            fail: false,
        });
        let service = QueryService::new(store.clone(), FakeProvider::answering("ok"), "test-model");

        service.ask("", 3).await.unwrap();
        assert_eq!(*store.queries.lock().unwrap(), vec![(String::new(), 3)]);
    }

    #[tokio::test]
    async fn test_negative_top_k_is_validation_error() {
        let provider = FakeProvider::answering("ok");
        let (_dir, store) = france_store().await;
        let service = QueryService::new(store, provider.clone(), "test-model");

        let err = service.ask("q", -1).await.unwrap_err();
        assert!(matches!(err, AskError::Validation(_)));
        assert_eq!(err.code(), "validation_error");
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_retrieval_error() {
        let store = Arc::new(ScriptedStore {
            queries: Mutex::new(Vec::new()),
            fail: true,
        });
        let provider = FakeProvider::answering("ok");
        let service = QueryService::new(store, provider.clone(), "test-model");

        let err = service.ask("q", 2).await.unwrap_err();
        assert!(matches!(err, AskError::Retrieval(_)));
        assert!(err.to_string().contains("database is locked"));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_generation_error() {
        let (_dir, store) = france_store().await;
        let service = QueryService::new(store, FakeProvider::failing(), "test-model");

        let err = service.ask("What is the capital of France?", 1).await.unwrap_err();
        assert!(matches!(err, AskError::Generation(_)));
        assert_eq!(err.code(), "generation_error");
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_missing_completion_text_is_generation_error() {
        let (_dir, store) = france_store().await;
        let service = QueryService::new(store, FakeProvider::silent(), "test-model");

        let err = service.ask("q", 1).await.unwrap_err();
        assert!(matches!(err, AskError::Generation(_)));
        assert!(err.to_string().contains("no text"));
    }
}
