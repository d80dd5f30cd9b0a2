use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One configured sensitive-pattern class: a token label plus the expression
/// that recognizes matching spans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternClassConfig {
    pub label: String,
    pub pattern: String,
}

/// A compiled pattern class. Order within a [`PatternSet`] is the configured
/// order and only breaks ties between equally long candidate spans.
#[derive(Clone, Debug)]
pub struct PatternClass {
    label: String,
    regex: Regex,
}

impl PatternClass {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern class label `{0}` must be non-empty and use only A-Z, 0-9, and underscore")]
    InvalidLabel(String),
    #[error("pattern class `{label}` has an invalid expression: {detail}")]
    InvalidExpression { label: String, detail: String },
}

/// The full, immutable set of pattern classes a tokenizer scans with.
/// Constructed once from configuration and shared read-only across requests.
#[derive(Clone, Debug, Default)]
pub struct PatternSet {
    classes: Vec<PatternClass>,
}

impl PatternSet {
    pub fn compile(classes: &[PatternClassConfig]) -> Result<Self, PatternError> {
        let mut compiled = Vec::with_capacity(classes.len());
        for class in classes {
            if !valid_label(&class.label) {
                return Err(PatternError::InvalidLabel(class.label.clone()));
            }
            let regex = Regex::new(&class.pattern).map_err(|err| {
                PatternError::InvalidExpression {
                    label: class.label.clone(),
                    detail: err.to_string(),
                }
            })?;
            compiled.push(PatternClass { label: class.label.clone(), regex });
        }
        Ok(Self { classes: compiled })
    }

    pub fn classes(&self) -> &[PatternClass] {
        &self.classes
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
}

/// The stock deployment pattern set: email-shaped, phone-shaped, and CRM
/// identifier-shaped spans.
pub fn default_classes() -> Vec<PatternClassConfig> {
    vec![
        PatternClassConfig {
            label: "EMAIL".to_string(),
            pattern: r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}".to_string(),
        },
        PatternClassConfig {
            label: "PHONE".to_string(),
            pattern: r"\+?\(?\d[\d\s\-().]{7,14}\d".to_string(),
        },
        PatternClassConfig {
            label: "ACCOUNT_ID".to_string(),
            pattern: r"\b[a-zA-Z0-9]{15,18}\b".to_string(),
        },
    ]
}
