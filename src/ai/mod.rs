//! All AI/LLM functionality

pub mod client;
pub mod sse;
pub mod tokens;

// Re-export main types for convenience
pub use client::{ActiveStreamingResponse, LlmClient, Summarizer, SummaryStream};
pub use sse::StreamEvent;
pub use tokens::{count_tokens, count_tokens_in_background};
