pub mod patterns;
pub mod tokenizer;

pub use patterns::{default_classes, PatternClass, PatternClassConfig, PatternError, PatternSet};
pub use tokenizer::{detokenize, TokenMap, Tokenizer};
