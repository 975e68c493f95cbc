//! Token counting with the tiktoken encoding of the configured model.
//!
//! Counts are only logged; nothing on the request path enforces a limit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tiktoken_rs::{CoreBPE, get_bpe_from_model};
use tracing::{debug, info};

use crate::errors::SummaryError;

/// Encoders keyed by model name; building one parses the whole BPE table.
static ENCODERS: Lazy<Mutex<HashMap<String, Arc<CoreBPE>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn cached_encoder(model: &str) -> Result<Option<Arc<CoreBPE>>, SummaryError> {
    let encoders = ENCODERS
        .lock()
        .map_err(|e| SummaryError::TokenizerError(format!("Encoder cache poisoned: {e}")))?;
    Ok(encoders.get(model).map(Arc::clone))
}

fn encoder_for_model(model: &str) -> Result<Arc<CoreBPE>, SummaryError> {
    if let Some(bpe) = cached_encoder(model)? {
        return Ok(bpe);
    }

    // Built without the lock held; a concurrent first load may build twice
    // and the first insert wins.
    debug!(model = %model, "Loading tiktoken encoder");
    let bpe = Arc::new(get_bpe_from_model(model).map_err(|e| {
        SummaryError::TokenizerError(format!("No tokenizer available for model '{model}': {e}"))
    })?);

    let mut encoders = ENCODERS
        .lock()
        .map_err(|e| SummaryError::TokenizerError(format!("Encoder cache poisoned: {e}")))?;
    Ok(Arc::clone(encoders.entry(model.to_string()).or_insert(bpe)))
}

/// Counts the tokens `text` occupies for `model`.
///
/// This is CPU-bound; async callers go through [`count_tokens_in_background`].
///
/// # Errors
///
/// Returns `SummaryError::TokenizerError` when tiktoken has no encoding for
/// the model.
pub fn count_tokens(text: &str, model: &str) -> Result<usize, SummaryError> {
    let bpe = encoder_for_model(model)?;
    let count = bpe.encode_with_special_tokens(text).len();
    info!(model = %model, tokens = count, "Counted input tokens");
    Ok(count)
}

/// Runs [`count_tokens`] on the blocking pool and hands `text` back with the count.
///
/// # Errors
///
/// Returns `SummaryError::TokenizerError` when counting fails or the
/// blocking task panics.
pub async fn count_tokens_in_background(
    text: String,
    model: String,
) -> Result<(String, usize), SummaryError> {
    tokio::task::spawn_blocking(move || {
        let count = count_tokens(&text, &model)?;
        Ok((text, count))
    })
    .await
    .map_err(|e| SummaryError::TokenizerError(format!("Token counting task failed: {e}")))?
}
