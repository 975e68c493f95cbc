use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to load configuration: {0}")]
    ConfigError(String),

    #[error("Failed to count tokens: {0}")]
    TokenizerError(String),

    #[error("Failed to access OpenAI API: {0}")]
    OpenAIError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

impl SummaryError {
    /// HTTP status the error surfaces as when it escapes a handler.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ConfigError(_) | Self::TokenizerError(_) | Self::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::OpenAIError(_) | Self::HttpError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::ConfigError(_) => "config_error",
            Self::TokenizerError(_) => "tokenizer_error",
            Self::OpenAIError(_) => "upstream_error",
            Self::HttpError(_) => "upstream_unavailable",
            Self::ServerError(_) => "server_error",
        }
    }
}

/// Renders an error followed by its `source()` chain, joined by `": "`.
#[must_use]
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

impl From<reqwest::Error> for SummaryError {
    fn from(error: reqwest::Error) -> Self {
        SummaryError::HttpError(error_chain(&error))
    }
}

impl IntoResponse for SummaryError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Validation failures use a bare `detail` body, everything else the `error` envelope.
        let body = match &self {
            Self::InvalidRequest(detail) => json!({ "detail": detail }),
            other => json!({
                "error": {
                    "message": other.to_string(),
                    "type": other.error_type(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}
