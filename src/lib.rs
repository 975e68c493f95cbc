//! Smart Summary - an HTTP service that streams LLM-generated summaries of submitted text.
//!
//! A request flows through a single path:
//! 1. `POST /v1/summarize` validates the JSON body (`text`, at least one character)
//! 2. The input is tokenized with the model's tiktoken encoding and the count is logged
//! 3. The summary agent calls the `OpenAI` Chat Completions API with `stream: true`
//! 4. Text deltas are forwarded to the client in order as a `text/event-stream` body
//!
//! # Architecture
//!
//! The system uses:
//! - axum and tower-http for routing, CORS and request tracing
//! - reqwest for the upstream `OpenAI` call, with an in-crate SSE parser
//! - tiktoken-rs for token counting
//! - utoipa for the `OpenAPI` document behind `/docs`
//! - Tokio for async runtime
//!
//! # Example
//!
//! ```no_run
//! use smart_summary::api::SummaryServer;
//! use smart_summary::core::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     smart_summary::setup_logging(config.log_format);
//!
//!     SummaryServer::new(config)?.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod api;
pub mod core;
pub mod errors;
pub mod prompt;

use crate::core::config::LogFormat;

/// Configure structured logging.
///
/// Installs a tracing-subscriber registry filtered by `RUST_LOG` (default
/// `info`) with either a JSON or a human-readable formatter. Calling it again
/// once a subscriber is installed is a no-op.
///
/// # Example
///
/// ```
/// smart_summary::setup_logging(smart_summary::core::config::LogFormat::Json);
/// ```
pub fn setup_logging(format: LogFormat) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
