//! # Registry Configuration
//!
//! The suppression rules, the coercion allowlist, and the traversal depth
//! bound are loaded together from one YAML document and compiled into an
//! immutable [`Policy`] that the comparator borrows for the whole run.
//!
//! A built-in registry for the document model ships with the crate as
//! [`DEFAULT_REGISTRY_YAML`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use wirecheck_core::{ConfigError, WirecheckError};

use crate::coercion::{CoercionList, CoercionSpec};
use crate::rules::{RuleSpec, SuppressionRegistry};

/// Default bound on nested message depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Built-in registry for the document model.
pub const DEFAULT_REGISTRY_YAML: &str = include_str!("../registry/docling.yaml");

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Serialized registry: suppressions, coercions, and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Nested message depth beyond which traversal is truncated.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Suppression rules.
    #[serde(default)]
    pub suppressions: Vec<RuleSpec>,
    /// Allowed coercions.
    #[serde(default)]
    pub coercions: Vec<CoercionSpec>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            suppressions: Vec::new(),
            coercions: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Parse a registry document.
    pub fn from_yaml_str(input: &str) -> Result<Self, WirecheckError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Read and parse a registry file.
    pub fn from_path(path: &Path) -> Result<Self, WirecheckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// The built-in document-model registry.
    pub fn builtin() -> Result<Self, WirecheckError> {
        Self::from_yaml_str(DEFAULT_REGISTRY_YAML)
    }

    /// Validate every rule and pattern and build the [`Policy`].
    pub fn compile(self) -> Result<Policy, ConfigError> {
        let rules = self
            .suppressions
            .into_iter()
            .map(RuleSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let policy = Policy {
            suppressions: SuppressionRegistry::new(rules)?,
            coercions: CoercionList::from_specs(self.coercions)?,
            max_depth: self.max_depth,
        };
        tracing::debug!(
            rules = policy.suppressions.rules().len(),
            coercions = policy.coercions.entries().len(),
            max_depth = policy.max_depth,
            "compiled registry"
        );
        Ok(policy)
    }
}

/// Compiled, read-only comparison policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Suppression rules.
    pub suppressions: SuppressionRegistry,
    /// Coercion allowlist.
    pub coercions: CoercionList,
    /// Nested message depth bound.
    pub max_depth: usize,
}

impl Policy {
    /// No suppressions, no coercions, default depth: pure default policy.
    pub fn strict() -> Self {
        Self {
            suppressions: SuppressionRegistry::empty(),
            coercions: CoercionList::empty(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// The compiled built-in registry.
    pub fn builtin() -> Result<Self, WirecheckError> {
        Ok(RegistryConfig::builtin()?.compile()?)
    }

    /// Override the depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
