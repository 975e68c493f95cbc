//! Request handlers for the summary API.

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::extract::ValidatedJson;
use crate::ai::{Summarizer, SummaryStream, count_tokens_in_background};
use crate::core::models::{HealthResponse, SummarizeRequest};
use crate::errors::SummaryError;

/// Body returned when a request reaches the handler without any text.
pub const EMPTY_TEXT_MESSAGE: &str = "Error: No text provided\n";

/// Shared state for handlers
pub struct AppState {
    pub summarizer: Arc<dyn Summarizer>,
    /// Model whose tokenizer is used for the logged token count.
    pub model_name: String,
}

impl AppState {
    pub fn new(summarizer: Arc<dyn Summarizer>, model_name: String) -> Self {
        Self {
            summarizer,
            model_name,
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Streams a summary of the submitted text.
#[utoipa::path(
    post,
    path = "/v1/summarize",
    tag = "summarize",
    request_body = SummarizeRequest,
    responses(
        (status = 200, description = "Summary chunks, streamed as they are generated", body = String, content_type = "text/event-stream"),
        (status = 422, description = "The request body failed validation"),
        (status = 500, description = "Token counting failed"),
        (status = 502, description = "The LLM provider call failed")
    )
)]
pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SummarizeRequest>,
) -> Result<Response, SummaryError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("summarize", %request_id);

    summarize(state, body.text, request_id).instrument(span).await
}

async fn summarize(
    state: Arc<AppState>,
    text: String,
    request_id: Uuid,
) -> Result<Response, SummaryError> {
    if text.is_empty() {
        warn!("Summarize request reached the handler without text");
        return Ok(empty_text_response());
    }

    let (text, _tokens) = count_tokens_in_background(text, state.model_name.clone())
        .await
        .inspect_err(|e| {
            error!(error = ?e, model = %state.model_name, "Token counting failed");
        })?;

    let mut upstream = state
        .summarizer
        .summarize_stream(&text)
        .await
        .inspect_err(|e| error!(error = ?e, "Summarization call failed"))?;

    // Nothing is sent to the client until the first chunk arrives, so an
    // early upstream failure still maps to an error status.
    let first = match upstream.next().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => {
            error!(error = ?e, "Summarization stream failed before the first chunk");
            return Err(e);
        }
        None => {
            error!("Summarizer produced an empty stream");
            return Err(SummaryError::OpenAIError(
                "Summarizer produced no output".to_string(),
            ));
        }
    };

    info!("Streaming summary to client");
    let chunks = futures::stream::once(async move { Ok(first) }).chain(upstream);
    Ok(stream_response(Box::pin(chunks.map(move |item| {
        item.inspect_err(|e| {
            error!(request_id = %request_id, error = ?e, "Summary stream aborted mid-response");
        })
    }))))
}

fn empty_text_response() -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        EMPTY_TEXT_MESSAGE,
    )
        .into_response()
}

fn stream_response(chunks: SummaryStream) -> Response {
    let body = Body::from_stream(chunks.map(|item| item.map(Bytes::from)));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}
