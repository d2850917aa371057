//! Plain data types passed between Ragbot components.

use serde::{Deserialize, Serialize};

/// A single stored line of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A document returned from a similarity search, with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document: Document,
    /// Cosine similarity in `[-1, 1]`; higher is closer.
    pub score: f32,
}

/// Chat message role. The prompt goes out as a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// A single chat message sent to a completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Parsed completion response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_wire_format() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_response_without_usage() {
        let resp: ProviderResponse =
            serde_json::from_str(r#"{"content": "ok", "finish_reason": null, "usage": null}"#)
                .unwrap();
        assert_eq!(resp.content.as_deref(), Some("ok"));
        assert!(resp.usage.is_none());
    }
}
