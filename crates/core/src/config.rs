use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::pii::{default_classes, PatternClassConfig, PatternSet};
use crate::validator::ValidatorConfig;

/// Immutable pipeline configuration, resolved once at startup and passed
/// into the tokenizer and validator explicitly. Precedence: built-in
/// defaults, then an optional TOML file, then `QUOTEBRIDGE_*` environment
/// variables.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub pii: PiiConfig,
    pub validation: ValidatorConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PiiConfig {
    pub enabled: bool,
    pub classes: Vec<PatternClassConfig>,
}

impl PiiConfig {
    /// Compiled pattern set honoring the enabled flag: disabled scrubbing
    /// yields an empty set, which tokenizes as a no-op.
    pub fn pattern_set(&self) -> Result<PatternSet, ConfigError> {
        if !self.enabled {
            return Ok(PatternSet::default());
        }
        PatternSet::compile(&self.classes).map_err(|err| ConfigError::Validation(err.to_string()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pii: PiiConfig { enabled: true, classes: default_classes() },
            validation: ValidatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("quotebridge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pii) = patch.pii {
            if let Some(enabled) = pii.enabled {
                self.pii.enabled = enabled;
            }
            if let Some(classes) = pii.classes {
                self.pii.classes = classes;
            }
        }

        if let Some(validation) = patch.validation {
            if let Some(price_tolerance) = validation.price_tolerance {
                self.validation.price_tolerance = price_tolerance;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUOTEBRIDGE_PII_ENABLED") {
            self.pii.enabled = parse_bool("QUOTEBRIDGE_PII_ENABLED", &value)?;
        }
        if let Some(value) = read_env("QUOTEBRIDGE_PRICE_TOLERANCE") {
            self.validation.price_tolerance =
                parse_decimal("QUOTEBRIDGE_PRICE_TOLERANCE", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validation.price_tolerance < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "validation.price_tolerance must not be negative".to_string(),
            ));
        }

        if self.pii.enabled && self.pii.classes.is_empty() {
            return Err(ConfigError::Validation(
                "pii.enabled is true but no pattern classes are configured".to_string(),
            ));
        }

        // Compiling here surfaces bad labels and expressions at load time
        // instead of on the first request.
        self.pii.pattern_set().map(|_| ())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quotebridge.toml"), PathBuf::from("config/quotebridge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pii: Option<PiiPatch>,
    validation: Option<ValidationPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PiiPatch {
    enabled: Option<bool>,
    classes: Option<Vec<PatternClassConfig>>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationPatch {
    price_tolerance: Option<Decimal>,
}
