//! LLM (`OpenAI`) API client module
//!
//! Wraps the Chat Completions endpoint behind the [`Summarizer`] trait, both
//! one-shot and streamed.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::sse::{ParseResult, SseParser, StreamEvent};
use crate::core::config::AppConfig;
use crate::errors::{SummaryError, error_chain};
use crate::prompt::compose_prompt;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered text chunks of a summary as they arrive from the provider.
pub type SummaryStream = Pin<Box<dyn Stream<Item = Result<String, SummaryError>> + Send>>;

/// Summary agent seam used by the HTTP layer.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produces the whole summary in one call.
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;

    /// Starts a streamed summary. The upstream request has been accepted by
    /// the time this returns `Ok`.
    async fn summarize_stream(&self, text: &str) -> Result<SummaryStream, SummaryError>;
}

/// LLM API client for generating summaries
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    org_id: Option<String>,
    model_name: String,
    base_url: String,
    system_prompt: Option<String>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("org_id", &self.org_id)
            .field("templated", &self.system_prompt.is_some())
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        api_key: String,
        org_id: Option<String>,
        model_name: String,
        base_url: String,
        system_prompt: Option<String>,
    ) -> Result<Self, SummaryError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                SummaryError::HttpError(format!(
                    "Failed to build OpenAI HTTP client: {}",
                    error_chain(&e)
                ))
            })?;

        info!(model = %model_name, base_url = %base_url, "SummaryAgent initialized with OpenAI LLM");

        Ok(Self {
            http,
            api_key,
            org_id,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
            system_prompt,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, SummaryError> {
        if config.openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; upstream calls will be rejected");
        }

        Self::new(
            config.openai_api_key.clone(),
            config.openai_org_id.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            config.system_prompt.clone(),
        )
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Builds the chat prompt: a single user message holding either the raw
    /// text or the instruction prefix followed by the text.
    #[must_use]
    pub fn build_prompt(&self, text: &str) -> Vec<ChatCompletionMessage> {
        vec![ChatCompletionMessage {
            role: MessageRole::user,
            content: Content::Text(compose_prompt(self.system_prompt.as_deref(), text)),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }]
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn headers(&self, streaming: bool) -> Result<HeaderMap, SummaryError> {
        let mut headers = HeaderMap::new();

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| SummaryError::HttpError(format!("Invalid Authorization header: {e}")))?;
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if streaming {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }

        if let Some(org) = &self.org_id {
            let org_value = HeaderValue::from_str(org).map_err(|e| {
                SummaryError::HttpError(format!("Invalid OpenAI-Organization header: {e}"))
            })?;
            headers.insert("OpenAI-Organization", org_value);
        }

        Ok(headers)
    }

    fn request_body(&self, prompt: &[ChatCompletionMessage], stream: bool) -> Value {
        json!({
            "model": self.model_name,
            "messages": build_chat_messages(prompt),
            "stream": stream,
        })
    }

    async fn send(&self, text: &str, stream: bool) -> Result<reqwest::Response, SummaryError> {
        let prompt = self.build_prompt(text);

        #[cfg(feature = "debug-logs")]
        info!("Using summary prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            input_chars = text.chars().count(),
            templated = self.system_prompt.is_some(),
            stream,
            "Generating summary for input text"
        );

        let response = self
            .http
            .post(self.completions_url())
            .headers(self.headers(stream)?)
            .json(&self.request_body(&prompt, stream))
            .send()
            .await
            .map_err(|e| {
                SummaryError::HttpError(format!("OpenAI API request failed: {}", error_chain(&e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(SummaryError::OpenAIError(format!(
                "OpenAI API error (status {status}): {error_text}"
            )));
        }

        Ok(response)
    }

    /// Generates the whole summary with a single non-streamed completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails, the provider answers with a
    /// non-success status, or the response carries no message content.
    pub async fn generate_summary(&self, text: &str) -> Result<String, SummaryError> {
        let result = async {
            let response = self.send(text, false).await?;
            let response_json: Value = response.json().await.map_err(|e| {
                SummaryError::OpenAIError(format!("Failed to parse OpenAI response: {e}"))
            })?;

            response_json
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|choices| choices.first())
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| SummaryError::OpenAIError("No text in response".to_string()))
        }
        .await;

        match &result {
            Ok(_) => info!("Summary generated successfully"),
            Err(e) => error!(error = ?e, model = %self.model_name, "Error during summarization"),
        }

        result
    }

    /// Starts a streamed completion and returns once the provider has
    /// accepted the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the provider answers
    /// with a non-success status.
    pub async fn generate_summary_stream(
        &self,
        text: &str,
    ) -> Result<ActiveStreamingResponse, SummaryError> {
        let response = self.send(text, true).await.inspect_err(|e| {
            error!(error = ?e, model = %self.model_name, "Error during summarization");
        })?;

        Ok(ActiveStreamingResponse::new(Box::pin(response.bytes_stream())))
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        self.generate_summary(text).await
    }

    async fn summarize_stream(&self, text: &str) -> Result<SummaryStream, SummaryError> {
        let response = self.generate_summary_stream(text).await?;
        Ok(response.into_text_stream())
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// An active streaming response from `OpenAI`.
pub struct ActiveStreamingResponse {
    byte_stream: ByteStream,
    parser: SseParser,
    pending_results: VecDeque<ParseResult>,
    utf8_buffer: Vec<u8>,
    finish_reason: Option<String>,
    saw_any_text: bool,
    completed: bool,
}

impl std::fmt::Debug for ActiveStreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveStreamingResponse")
            .field("completed", &self.completed)
            .field("finish_reason", &self.finish_reason)
            .field("saw_any_text", &self.saw_any_text)
            .field("pending_results_len", &self.pending_results.len())
            .field("utf8_buffer_len", &self.utf8_buffer.len())
            .field("parser_buffer_len", &self.parser.remaining_buffer().len())
            .finish_non_exhaustive()
    }
}

impl ActiveStreamingResponse {
    fn new(byte_stream: ByteStream) -> Self {
        Self {
            byte_stream,
            parser: SseParser::new(),
            pending_results: VecDeque::new(),
            utf8_buffer: Vec::new(),
            finish_reason: None,
            saw_any_text: false,
            completed: false,
        }
    }

    /// The stream ended (by `[DONE]` or connection close). That is only a
    /// success once the provider produced text.
    fn finish_at_end_of_stream(&mut self, how: &str) -> Result<Option<StreamEvent>, SummaryError> {
        self.completed = true;
        if !self.saw_any_text {
            let reason = self.finish_reason.as_deref().unwrap_or("none");
            warn!(finish_reason = %reason, "OpenAI stream {how} before producing any output");
            return Err(SummaryError::OpenAIError(format!(
                "OpenAI stream {how} before producing any output (finish_reason: {reason})"
            )));
        }
        if self.finish_reason.is_none() {
            warn!("OpenAI stream {how} without a finish_reason; treating as completed");
        }
        info!("Summary generated successfully");
        Ok(None)
    }

    fn drain_pending_results(&mut self) -> Result<Option<StreamEvent>, SummaryError> {
        while let Some(result) = self.pending_results.pop_front() {
            match result {
                ParseResult::Event(StreamEvent::TextDelta(delta)) => {
                    if !delta.is_empty() {
                        self.saw_any_text = true;
                    }
                    return Ok(Some(StreamEvent::TextDelta(delta)));
                }
                ParseResult::Event(StreamEvent::Finished(reason)) => {
                    if reason == "length" {
                        warn!("OpenAI stopped at the output token limit; summary is truncated");
                    }
                    self.finish_reason = Some(reason.clone());
                    return Ok(Some(StreamEvent::Finished(reason)));
                }
                ParseResult::Event(StreamEvent::Error(msg)) => {
                    self.completed = true;
                    self.pending_results.clear();
                    return Ok(Some(StreamEvent::Error(msg)));
                }
                ParseResult::Done => {
                    self.pending_results.clear();
                    return self.finish_at_end_of_stream("ended with [DONE]");
                }
                ParseResult::Ignored => {
                    debug!("Ignoring OpenAI stream chunk without content");
                }
            }
        }

        Ok(None)
    }

    /// Feeds the longest valid UTF-8 prefix of the byte buffer into the SSE
    /// parser, keeping an incomplete trailing sequence for the next chunk.
    fn feed_utf8(&mut self) -> Result<(), SummaryError> {
        let valid_up_to = match std::str::from_utf8(&self.utf8_buffer) {
            Ok(_) => self.utf8_buffer.len(),
            Err(e) if e.error_len().is_some() => {
                self.completed = true;
                return Err(SummaryError::OpenAIError(
                    "Invalid UTF-8 in OpenAI streaming response".to_string(),
                ));
            }
            Err(e) => e.valid_up_to(),
        };

        if valid_up_to == 0 {
            return Ok(());
        }

        let valid: Vec<u8> = self.utf8_buffer.drain(..valid_up_to).collect();
        let text = String::from_utf8(valid).map_err(|e| {
            self.completed = true;
            SummaryError::OpenAIError(format!("Invalid UTF-8 in OpenAI streaming response: {e}"))
        })?;
        self.pending_results.extend(self.parser.feed(&text));
        Ok(())
    }

    /// Returns the next stream event, or `None` once the stream is complete.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, invalid UTF-8, or a stream
    /// that ends before producing any output.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, SummaryError> {
        loop {
            // Drain first: one HTTP chunk may carry several frames.
            if let Some(event) = self.drain_pending_results()? {
                return Ok(Some(event));
            }
            if self.completed {
                return Ok(None);
            }

            match self.byte_stream.next().await {
                Some(Ok(bytes)) => {
                    self.utf8_buffer.extend_from_slice(&bytes);
                    self.feed_utf8()?;
                }
                Some(Err(e)) => {
                    self.completed = true;
                    return Err(SummaryError::HttpError(format!(
                        "Error reading streaming response: {}",
                        error_chain(&e)
                    )));
                }
                None => return self.finish_at_end_of_stream("closed"),
            }
        }
    }

    /// Collects all remaining text deltas into a single string.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails or carries an error event.
    pub async fn collect_text(&mut self) -> Result<String, SummaryError> {
        let mut collected = String::new();

        while let Some(event) = self.next_event().await? {
            match event {
                StreamEvent::TextDelta(delta) => collected.push_str(&delta),
                StreamEvent::Finished(_) => {}
                StreamEvent::Error(msg) => {
                    return Err(SummaryError::OpenAIError(format!(
                        "OpenAI streaming error: {msg}"
                    )));
                }
            }
        }

        Ok(collected)
    }

    /// Adapts the response into a stream of non-empty text chunks. The stream
    /// ends after the first error.
    #[must_use]
    pub fn into_text_stream(self) -> SummaryStream {
        Box::pin(futures::stream::unfold(self, |mut response| async move {
            loop {
                match response.next_event().await {
                    Ok(Some(StreamEvent::TextDelta(delta))) if !delta.is_empty() => {
                        return Some((Ok(delta), response));
                    }
                    Ok(Some(StreamEvent::TextDelta(_) | StreamEvent::Finished(_))) => {}
                    Ok(Some(StreamEvent::Error(msg))) => {
                        return Some((
                            Err(SummaryError::OpenAIError(format!(
                                "OpenAI streaming error: {msg}"
                            ))),
                            response,
                        ));
                    }
                    Ok(None) => return None,
                    Err(e) => return Some((Err(e), response)),
                }
            }
        }))
    }
}

/// Serializes the prompt into Chat Completions `messages`.
pub(crate) fn build_chat_messages(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                MessageRole::system => "system",
                MessageRole::assistant => "assistant",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
            };

            match &m.content {
                Content::Text(text) => Some(json!({ "role": role, "content": text })),
                Content::ImageUrl(_) => None,
            }
        })
        .collect()
}
