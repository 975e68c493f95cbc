use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request-level validation run by the `ValidatedJson` extractor before a
/// handler sees the payload.
pub trait Validate {
    /// # Errors
    ///
    /// Returns a human-readable description of the first violated constraint.
    fn validate(&self) -> Result<(), String>;
}

/// Body of `POST /v1/summarize`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummarizeRequest {
    /// Free-form text to summarize.
    #[schema(min_length = 1, example = "Rust is a systems programming language focused on safety.")]
    pub text: String,
}

impl SummarizeRequest {
    pub const TEXT_MIN_LENGTH: usize = 1;
}

impl Validate for SummarizeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.text.chars().count() < Self::TEXT_MIN_LENGTH {
            return Err(format!(
                "text: String should have at least {} character",
                Self::TEXT_MIN_LENGTH
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
}

impl HealthResponse {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
