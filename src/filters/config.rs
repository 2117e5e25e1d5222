//! Per-hook filter configuration: defaults, exclusivity, validators.
//!
//! Built in code with the `with_*` methods, or loaded from TOML:
//!
//! ```toml
//! exclude_from_active = ["view"]
//! mutually_exclusive = [["country", "entity"]]
//!
//! [defaults]
//! topN = 5
//!
//! [validators.topN]
//! kind = "range"
//! min = 1
//! max = 20
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::filters::key::{FilterKey, SystemKey, ValueKind};
use crate::filters::value::FilterValue;

/// Errors that can occur when loading a filter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read filter config '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse filter config '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse filter config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Unknown filter key '{key}'")]
    UnknownKey { key: String },

    #[error("Filter config validation failed: {message}")]
    ValidationError { message: String },
}

type Predicate = dyn Fn(&FilterValue) -> bool + Send + Sync;

/// Write-time predicate for one filter key.
#[derive(Clone)]
pub struct Validator {
    description: String,
    predicate: Arc<Predicate>,
}

impl Validator {
    /// Any predicate. `description` shows up in rejection diagnostics.
    pub fn custom(
        description: impl Into<String>,
        predicate: impl Fn(&FilterValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Inclusive numeric range.
    pub fn range(min: i64, max: i64) -> Self {
        Self::custom(format!("number in {}..={}", min, max), move |v| {
            v.as_number().is_some_and(|n| (min..=max).contains(&n))
        })
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = values.into_iter().map(Into::into).collect();
        Self::custom(format!("one of {:?}", allowed), move |v| {
            v.as_text().is_some_and(|s| allowed.iter().any(|a| a == s))
        })
    }

    pub fn non_empty() -> Self {
        Self::custom("non-empty text", |v| {
            v.as_text().is_some_and(|s| !s.trim().is_empty())
        })
    }

    /// Text of at most `len` characters.
    pub fn max_len(len: usize) -> Self {
        Self::custom(format!("text of at most {} characters", len), move |v| {
            v.as_text().is_some_and(|s| s.chars().count() <= len)
        })
    }

    pub fn check(&self, value: &FilterValue) -> bool {
        (self.predicate)(value)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Validator").field(&self.description).finish()
    }
}

/// Two keys that may not both hold a value. Unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusivePair(pub FilterKey, pub FilterKey);

impl ExclusivePair {
    /// The other member, if `key` belongs to this pair.
    pub fn partner_of(&self, key: FilterKey) -> Option<FilterKey> {
        if self.0 == key {
            Some(self.1)
        } else if self.1 == key {
            Some(self.0)
        } else {
            None
        }
    }
}

/// Configuration supplied to one [`FilterHook`](crate::filters::FilterHook).
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    defaults: BTreeMap<FilterKey, FilterValue>,
    mutually_exclusive: Vec<ExclusivePair>,
    validators: BTreeMap<FilterKey, Validator>,
    exclude_from_active: BTreeSet<FilterKey>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback value for `key` when the store has none.
    pub fn with_default(mut self, key: FilterKey, value: impl Into<FilterValue>) -> Self {
        self.defaults.insert(key, value.into());
        self
    }

    pub fn with_exclusive(mut self, a: FilterKey, b: FilterKey) -> Self {
        self.mutually_exclusive.push(ExclusivePair(a, b));
        self
    }

    /// Replaces any validator already registered for `key`.
    pub fn with_validator(mut self, key: FilterKey, validator: Validator) -> Self {
        self.validators.insert(key, validator);
        self
    }

    /// Keep `key` out of the active-filter set even when present.
    pub fn exclude_from_active(mut self, key: FilterKey) -> Self {
        self.exclude_from_active.insert(key);
        self
    }

    pub fn default_for(&self, key: FilterKey) -> Option<&FilterValue> {
        self.defaults.get(&key)
    }

    pub fn validator_for(&self, key: FilterKey) -> Option<&Validator> {
        self.validators.get(&key)
    }

    pub fn is_excluded_from_active(&self, key: FilterKey) -> bool {
        self.exclude_from_active.contains(&key)
    }

    pub fn exclusive_pairs(&self) -> &[ExclusivePair] {
        &self.mutually_exclusive
    }

    /// Every key declared mutually exclusive with `key`.
    pub fn partners(&self, key: FilterKey) -> Vec<FilterKey> {
        let mut partners: Vec<FilterKey> = self
            .mutually_exclusive
            .iter()
            .filter_map(|pair| pair.partner_of(key))
            .collect();
        partners.sort();
        partners.dedup();
        partners
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawFilterConfig = toml::from_str(content)?;
        raw.into_config()
    }

    /// Load from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let raw: RawFilterConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let config = raw.into_config()?;
        tracing::debug!(path = %path.display(), "Filter config loaded");
        Ok(config)
    }

    /// Check the configuration for integration mistakes.
    ///
    /// Checks:
    /// - Defaults match their key's kind and pass its validator
    /// - No key is declared exclusive with itself
    ///
    /// Hooks do not call this; configs built in code are trusted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in &self.defaults {
            if value.kind() != key.kind() {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Default for '{}' is {:?}, expected {:?}",
                        key,
                        value.kind(),
                        key.kind()
                    ),
                });
            }
            if let Some(validator) = self.validators.get(key) {
                if !validator.check(value) {
                    return Err(ConfigError::ValidationError {
                        message: format!(
                            "Default '{}' for '{}' fails validator ({})",
                            value,
                            key,
                            validator.description()
                        ),
                    });
                }
            }
        }

        if let Some(pair) = self.mutually_exclusive.iter().find(|p| p.0 == p.1) {
            return Err(ConfigError::ValidationError {
                message: format!("'{}' is declared mutually exclusive with itself", pair.0),
            });
        }

        Ok(())
    }
}

/// Declarative validator as written in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ValidatorSpec {
    Range { min: i64, max: i64 },
    OneOf { values: Vec<String> },
    NonEmpty,
    MaxLen { len: usize },
}

impl ValidatorSpec {
    fn value_kind(&self) -> ValueKind {
        match self {
            Self::Range { .. } => ValueKind::Number,
            _ => ValueKind::Text,
        }
    }

    fn into_validator(self) -> Validator {
        match self {
            Self::Range { min, max } => Validator::range(min, max),
            Self::OneOf { values } => Validator::one_of(values),
            Self::NonEmpty => Validator::non_empty(),
            Self::MaxLen { len } => Validator::max_len(len),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFilterConfig {
    defaults: BTreeMap<String, FilterValue>,
    mutually_exclusive: Vec<[String; 2]>,
    validators: BTreeMap<String, ValidatorSpec>,
    exclude_from_active: Vec<String>,
}

impl RawFilterConfig {
    fn into_config(self) -> Result<FilterConfig, ConfigError> {
        let mut config = FilterConfig::new();

        for (name, value) in self.defaults {
            config = config.with_default(filter_key(&name)?, value);
        }

        for [a, b] in self.mutually_exclusive {
            config = config.with_exclusive(filter_key(&a)?, filter_key(&b)?);
        }

        for (name, spec) in self.validators {
            let key = filter_key(&name)?;
            if spec.value_kind() != key.kind() {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Validator for '{}' expects {:?} values, key is {:?}",
                        key,
                        spec.value_kind(),
                        key.kind()
                    ),
                });
            }
            config = config.with_validator(key, spec.into_validator());
        }

        for name in self.exclude_from_active {
            config = config.exclude_from_active(filter_key(&name)?);
        }

        config.validate()?;
        Ok(config)
    }
}

fn filter_key(name: &str) -> Result<FilterKey, ConfigError> {
    if SystemKey::is_system(name) {
        return Err(ConfigError::ValidationError {
            message: format!("System key '{}' cannot be used as a filter", name),
        });
    }
    FilterKey::parse(name).ok_or_else(|| ConfigError::UnknownKey {
        key: name.to_string(),
    })
}
