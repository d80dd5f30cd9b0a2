pub mod llm;
pub mod pipeline;

pub use llm::{parse_candidate, GenerationClient, GenerationError, GenerationRequest};
pub use pipeline::{PipelineError, QuotePipeline, QuoteRequest};
