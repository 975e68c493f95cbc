//! Server-Sent Events (SSE) parser for `OpenAI` Chat Completions streaming.
//!
//! Handles frames split across TCP chunks and several frames arriving in one
//! read. Each `data:` payload is a `chat.completion.chunk` object; the stream
//! ends with a literal `[DONE]` sentinel.

use serde_json::Value;

/// Events emitted by the Chat Completions streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Content carried by `choices[0].delta.content`.
    TextDelta(String),
    /// `choices[0].finish_reason` was set (`stop`, `length`, `content_filter`, ...).
    Finished(String),
    /// An `error` object arrived in-band, or a frame could not be decoded.
    Error(String),
}

/// Result of parsing a single SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    Event(StreamEvent),
    /// A well-formed chunk with nothing to forward (role-only delta, usage-only chunk).
    Ignored,
    /// End of stream signal (`[DONE]`).
    Done,
}

/// Stateful SSE parser that buffers incomplete frames across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of data and returns every frame completed by it, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<ParseResult> {
        self.buffer.push_str(chunk);
        let mut results = Vec::new();

        while let Some((frame_end, boundary_len)) = self.find_frame_boundary() {
            let frame: String = self.buffer.drain(..frame_end + boundary_len).collect();
            if let Some(result) = Self::parse_frame(&frame[..frame_end]) {
                results.push(result);
            }
        }

        results
    }

    /// Position and length of the first blank-line separator, whichever
    /// line ending style comes first.
    fn find_frame_boundary(&self) -> Option<(usize, usize)> {
        let lf = self.buffer.find("\n\n").map(|pos| (pos, 2));
        let crlf = self.buffer.find("\r\n\r\n").map(|pos| (pos, 4));

        match (lf, crlf) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    fn parse_frame(frame: &str) -> Option<ParseResult> {
        // Multi-line data fields are joined with '\n'; `event:`, `id:` and comments are ignored.
        let data = frame
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if data.is_empty() {
            return None;
        }

        if data == "[DONE]" {
            return Some(ParseResult::Done);
        }

        Some(Self::parse_chunk_json(&data))
    }

    fn parse_chunk_json(data: &str) -> ParseResult {
        let json: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                return ParseResult::Event(StreamEvent::Error(format!(
                    "Failed to parse OpenAI SSE JSON payload: {e}"
                )));
            }
        };

        if let Some(message) = extract_error_message(&json) {
            return ParseResult::Event(StreamEvent::Error(message));
        }

        let Some(choice) = json
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        else {
            return ParseResult::Ignored;
        };

        if let Some(content) = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
        {
            return ParseResult::Event(StreamEvent::TextDelta(content.to_string()));
        }

        match choice.get("finish_reason").and_then(Value::as_str) {
            Some(reason) => ParseResult::Event(StreamEvent::Finished(reason.to_string())),
            None => ParseResult::Ignored,
        }
    }

    /// Returns any remaining buffered data.
    #[must_use]
    pub fn remaining_buffer(&self) -> &str {
        &self.buffer
    }
}

fn extract_error_message(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    if error.is_null() {
        return None;
    }

    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("Unknown error");

    Some(message.to_string())
}
