//! Contract for the external generation service.
//!
//! The service is the pipeline's only source of non-determinism and its only
//! producer of adversarial input: everything it returns is unverified until
//! the validator has processed it. How the call is made (protocol, retries,
//! model selection) is the implementor's concern; the pipeline depends only
//! on this trait and the shape of the returned document.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use quotebridge_core::domain::product::ProductRef;

/// Everything a generation call may see. The prompt and org context must
/// already be sanitized by the time this struct is built; nothing in here
/// carries raw sensitive text.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub rule_context: Option<Value>,
    pub org_context: Option<String>,
    pub products: Vec<ProductRef>,
    pub session_id: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation transport failed: {0}")]
    Transport(String),
    #[error("generation service returned malformed output: {detail}")]
    MalformedResponse { detail: String, snippet: String },
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Produces an untrusted candidate quote document for a sanitized
    /// request, or fails. Timeouts and retries live behind this call.
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

/// Parses raw generation output into a candidate document, tolerating the
/// markdown code fences some services wrap JSON in. Client implementations
/// share this so a fenced response never counts as malformed.
pub fn parse_candidate(raw: &str) -> Result<Value, GenerationError> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).map_err(|err| GenerationError::MalformedResponse {
        detail: err.to_string(),
        snippet: truncated(raw, 200),
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic());
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn truncated(raw: &str, limit: usize) -> String {
    match raw.char_indices().nth(limit) {
        Some((index, _)) => raw[..index].to_string(),
        None => raw.to_string(),
    }
}
