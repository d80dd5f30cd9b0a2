pub mod config;
pub mod domain;
pub mod errors;
pub mod pii;
pub mod validator;

pub use config::{ConfigError, PiiConfig, PipelineConfig};
pub use domain::document::{Approval, AuditedQuote, QuoteLine, QuoteSummary};
pub use domain::product::{ProductCatalog, ProductRef};
pub use errors::AuditError;
pub use pii::{detokenize, PatternClass, PatternClassConfig, PatternSet, TokenMap, Tokenizer};
pub use validator::{QuoteValidator, ValidatorConfig};
