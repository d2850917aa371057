//! Mapping of query failures to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragbot_agent::AskError;

/// HTTP-facing error. Body: `{"detail": <message>, "code": <machine code>}`.
#[derive(Debug)]
pub struct ApiError(pub AskError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AskError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AskError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AskError::Generation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<AskError> for ApiError {
    fn from(e: AskError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "detail": self.0.to_string(),
            "code": self.0.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
