//! Configuration types

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// What the comparator does when two records report different types for the
/// same sort field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeMismatchPolicy {
    /// The field contributes no ordering signal; comparison moves on to the
    /// next field.
    #[default]
    NoSignal,
    /// The first record's type selects the accessor for both records. An
    /// accessor failure on the second record degrades the whole comparison to
    /// equal.
    FirstRecord,
}

/// Field comparator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorConfig {
    /// Sort fields in priority order.
    pub fields: Vec<String>,
    #[serde(default)]
    pub type_mismatch: TypeMismatchPolicy,
}

impl ComparatorConfig {
    /// Create a config for the given fields with the default mismatch policy.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            type_mismatch: TypeMismatchPolicy::default(),
        }
    }

    /// Set the type mismatch policy.
    pub fn with_type_mismatch(mut self, policy: TypeMismatchPolicy) -> Self {
        self.type_mismatch = policy;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the field list is non-empty and has no blank names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::EmptyFieldList);
        }
        if let Some(index) = self.fields.iter().position(|f| f.trim().is_empty()) {
            return Err(ConfigError::BlankFieldName { index });
        }
        Ok(())
    }
}

/// View cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewCacheConfig {
    /// File every handle under its canonical name as well as the requested one.
    pub register_canonical_alias: bool,
    /// When an alias opens a resource whose canonical name is already cached,
    /// release the fresh handle and share the cached one.
    pub reconcile_duplicate_opens: bool,
}

impl Default for ViewCacheConfig {
    fn default() -> Self {
        Self {
            register_canonical_alias: true,
            reconcile_duplicate_opens: true,
        }
    }
}

impl ViewCacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable canonical alias registration.
    pub fn with_canonical_alias(mut self, enabled: bool) -> Self {
        self.register_canonical_alias = enabled;
        self
    }

    /// Enable or disable duplicate-open reconciliation.
    pub fn with_reconcile(mut self, enabled: bool) -> Self {
        self.reconcile_duplicate_opens = enabled;
        self
    }
}
