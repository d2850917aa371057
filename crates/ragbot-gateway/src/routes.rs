//! API route handlers for the gateway.

use axum::extract::rejection::JsonRejection;
use axum::{Json, extract::State};
use ragbot_agent::{Answer, AskError, DEFAULT_TOP_K};
use ragbot_core::traits::{DocumentStore, Provider};
use serde::{Deserialize, Deserializer, de};
use std::sync::Arc;

use super::error::ApiError;
use super::server::AppState;

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_top_k", deserialize_with = "lenient_int")]
    pub top_k: i64,
}

fn default_top_k() -> i64 {
    DEFAULT_TOP_K
}

/// Accept `3`, `3.0` and `"3"` alike; reject fractions and non-numbers.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    struct IntVisitor;

    impl de::Visitor<'_> for IntVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(format!("integer {v} out of range")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(IntVisitor)
}

/// Answer a question from the document store.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(req) = payload.map_err(|e| AskError::Validation(e.body_text()))?;

    match state.query.ask(&req.question, req.top_k).await {
        Ok(answer) => Ok(Json(answer)),
        Err(e) => {
            tracing::error!("❌ /ask failed ({}): {e}", e.code());
            Err(e.into())
        }
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let documents = match state.query.store().count().await {
        Ok(n) => serde_json::json!(n),
        Err(e) => {
            tracing::warn!("⚠️ Health check could not count documents: {e}");
            serde_json::Value::Null
        }
    };
    let provider_ready =
        match tokio::time::timeout(state.health_timeout, state.query.provider().health_check())
            .await
        {
            Ok(result) => result.unwrap_or(false),
            Err(_) => {
                tracing::warn!(
                    "⚠️ Provider health check timed out after {:?}",
                    state.health_timeout
                );
                false
            }
        };

    Json(serde_json::json!({
        "status": "ok",
        "service": "ragbot",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "documents": documents,
        "provider": state.query.provider().name(),
        "provider_ready": provider_ready,
        "model": state.query.model(),
    }))
}
