//! The request pipeline: scrub, generate, audit, restore.
//!
//! Sanitization and validation are pure and synchronous; the generation call
//! sits strictly between them and is the only await point. The token map
//! never leaves the request, is never logged, and dies when the response
//! is returned.
//! An audited document is not pre-sanitized input: chaining a second
//! generation call means tokenizing again from scratch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use quotebridge_core::config::{ConfigError, PipelineConfig};
use quotebridge_core::domain::document::AuditedQuote;
use quotebridge_core::domain::product::{ProductCatalog, ProductRef};
use quotebridge_core::errors::AuditError;
use quotebridge_core::pii::{detokenize, Tokenizer};
use quotebridge_core::validator::QuoteValidator;

use crate::llm::{GenerationClient, GenerationError, GenerationRequest};

/// A caller's raw, untokenized request. The pipeline owns scrubbing it;
/// callers never pre-sanitize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub prompt: String,
    #[serde(default)]
    pub rule_context: Option<Value>,
    #[serde(default)]
    pub org_context: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductRef>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

pub struct QuotePipeline<C> {
    client: C,
    tokenizer: Tokenizer,
    validator: QuoteValidator,
}

impl<C> QuotePipeline<C>
where
    C: GenerationClient,
{
    pub fn new(client: C, tokenizer: Tokenizer, validator: QuoteValidator) -> Self {
        Self { client, tokenizer, validator }
    }

    /// Wires a pipeline from resolved configuration and the caller's trusted
    /// catalog.
    pub fn from_config(
        client: C,
        config: &PipelineConfig,
        catalog: ProductCatalog,
    ) -> Result<Self, ConfigError> {
        let tokenizer = Tokenizer::new(config.pii.pattern_set()?);
        let validator = QuoteValidator::new(catalog, config.validation.clone());
        Ok(Self::new(client, tokenizer, validator))
    }

    pub async fn run(&self, request: QuoteRequest) -> Result<AuditedQuote, PipelineError> {
        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (sanitized_prompt, token_map) = self.tokenizer.tokenize(&request.prompt);
        let org_context =
            request.org_context.as_deref().map(|context| self.tokenizer.tokenize_opaque(context));

        info!(
            event_name = "pipeline.generation.request",
            session_id = %session_id,
            scrubbed_spans = token_map.len(),
            product_count = request.products.len(),
            "candidate generation requested"
        );

        let generation_request = GenerationRequest {
            prompt: sanitized_prompt,
            rule_context: request.rule_context,
            org_context,
            products: request.products,
            session_id: session_id.clone(),
        };

        let candidate = match self.client.generate(&generation_request).await {
            Ok(candidate) => candidate,
            Err(failure) => {
                error!(
                    event_name = "pipeline.generation.failed",
                    session_id = %session_id,
                    error = %failure,
                    "generation call failed"
                );
                return Err(failure.into());
            }
        };

        let mut audited = self.validator.validate(&candidate)?;

        // Originals come back only in text headed for human eyes.
        audited.warnings =
            audited.warnings.iter().map(|warning| detokenize(warning, &token_map)).collect();

        info!(
            event_name = "pipeline.quote.audited",
            session_id = %session_id,
            line_count = audited.quote_lines.len(),
            warning_count = audited.warnings.len(),
            "candidate document audited"
        );

        Ok(audited)
    }
}
