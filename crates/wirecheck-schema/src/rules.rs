//! # Suppression Registry
//!
//! Declarative exceptions to the default comparison policy. Each rule names
//! a structural divergence between the two schemas that is intentional and
//! understood, with its rationale. The registry is a pure lookup: it never
//! changes during a run and knows nothing about traversal state.
//!
//! ## Rule kinds
//!
//! | Kind | Matches | Effect |
//! |---|---|---|
//! | `field_alias` | domain field name | pair with a differently named wire field |
//! | `custom_field_prefix` | path prefix | suppress the subtree |
//! | `proto_only_prefix` | path prefix | suppress the subtree |
//! | `enum_fallback_suffix` | path suffix | suppress the subtree |
//! | `base_field_wrapper` | wire message name | flatten its base field |
//! | `oneof_wrapper` | wire message name | validate members independently |
//! | `leaf_message` | wire message name | stop descent |
//!
//! A path not covered by any rule is reported under default policy, so every
//! new divergence has to be classified explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use wirecheck_core::{ConfigError, FieldPath};

/// How a rule's subject is matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Matcher {
    /// Whole path or name equality (`**.` allowed for paths).
    Exact(String),
    /// Path equal to or below the pattern.
    Prefix(String),
    /// Trailing path segments.
    Suffix(String),
}

impl Matcher {
    /// The pattern text.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Exact(p) | Self::Prefix(p) | Self::Suffix(p) => p,
        }
    }

    /// Whether the matcher covers `path`.
    pub fn matches_path(&self, path: &FieldPath) -> bool {
        match self {
            Self::Exact(p) => path.matches_exact(p),
            Self::Prefix(p) => path.matches_prefix(p),
            Self::Suffix(p) => path.matches_suffix(p),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "exact:{p}"),
            Self::Prefix(p) => write!(f, "prefix:{p}"),
            Self::Suffix(p) => write!(f, "suffix:{p}"),
        }
    }
}

/// Validate a dotted path pattern: non-empty segments, `**` only as a
/// leading `**.` marker.
pub(crate) fn validate_path_pattern(pattern: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };
    let body = pattern.strip_prefix("**.").unwrap_or(pattern);
    if body.is_empty() {
        return Err(invalid("empty pattern"));
    }
    for segment in body.split('.') {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if segment.contains('*') {
            return Err(invalid("wildcards are only allowed as a leading `**.`"));
        }
    }
    Ok(())
}

/// What a rule does when it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// The matched domain field pairs with the named wire field.
    FieldAlias {
        /// Wire-side field name.
        wire: String,
    },
    /// Subtree reached through dynamic custom-field accessors.
    CustomFieldPrefix,
    /// Subtree that only exists on the wire.
    ProtoOnlyPrefix,
    /// Wire-only raw companion of an enum field.
    EnumFallbackSuffix,
    /// The matched wire message holds inherited fields in `field`.
    BaseFieldWrapper {
        /// Name of the wrapper field to flatten.
        field: String,
    },
    /// The matched wire message is a oneof over these domain messages.
    OneofWrapper {
        /// Wrapped message names.
        members: BTreeSet<String>,
    },
    /// The matched wire message is never descended into.
    LeafMessage,
}

impl RuleKind {
    /// Stable kind name, as used in registry files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FieldAlias { .. } => "field_alias",
            Self::CustomFieldPrefix => "custom_field_prefix",
            Self::ProtoOnlyPrefix => "proto_only_prefix",
            Self::EnumFallbackSuffix => "enum_fallback_suffix",
            Self::BaseFieldWrapper { .. } => "base_field_wrapper",
            Self::OneofWrapper { .. } => "oneof_wrapper",
            Self::LeafMessage => "leaf_message",
        }
    }

    /// Whether a match suppresses the whole subtree at a path.
    pub fn suppresses_subtree(&self) -> bool {
        matches!(
            self,
            Self::CustomFieldPrefix | Self::ProtoOnlyPrefix | Self::EnumFallbackSuffix
        )
    }
}

/// One compiled suppression rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionRule {
    /// Effect.
    pub kind: RuleKind,
    /// Subject matcher.
    pub matcher: Matcher,
    /// Why the divergence is acceptable.
    pub rationale: String,
}

impl fmt::Display for SuppressionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.name(), self.matcher)?;
        match &self.kind {
            RuleKind::FieldAlias { wire } => write!(f, " -> {wire}")?,
            RuleKind::BaseFieldWrapper { field } => write!(f, " via {field}")?,
            RuleKind::OneofWrapper { members } => {
                let members: Vec<&str> = members.iter().map(String::as_str).collect();
                write!(f, " [{}]", members.join(", "))?;
            }
            _ => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// A rule as written in a registry file, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// `domain` field pairs with `wire` field.
    FieldAlias { domain: String, wire: String, rationale: String },
    /// Dynamic custom-field subtree.
    CustomFieldPrefix { prefix: String, rationale: String },
    /// Wire-only subtree.
    ProtoOnlyPrefix { prefix: String, rationale: String },
    /// Raw enum companion fields.
    EnumFallbackSuffix { suffix: String, rationale: String },
    /// Flatten `message.field`.
    BaseFieldWrapper { message: String, field: String, rationale: String },
    /// `message` is a oneof over `members`.
    OneofWrapper { message: String, members: Vec<String>, rationale: String },
    /// Never descend into `message`.
    LeafMessage { message: String, rationale: String },
}

impl RuleSpec {
    /// Validate and compile into a [`SuppressionRule`].
    pub fn compile(self) -> Result<SuppressionRule, ConfigError> {
        let (kind, matcher, rationale) = match self {
            Self::FieldAlias { domain, wire, rationale } => {
                validate_name(&wire)?;
                (RuleKind::FieldAlias { wire }, Matcher::Exact(domain), rationale)
            }
            Self::CustomFieldPrefix { prefix, rationale } => {
                (RuleKind::CustomFieldPrefix, Matcher::Prefix(prefix), rationale)
            }
            Self::ProtoOnlyPrefix { prefix, rationale } => (RuleKind::ProtoOnlyPrefix, Matcher::Prefix(prefix), rationale),
            Self::EnumFallbackSuffix { suffix, rationale } => {
                (RuleKind::EnumFallbackSuffix, Matcher::Suffix(suffix), rationale)
            }
            Self::BaseFieldWrapper { message, field, rationale } => {
                validate_name(&field)?;
                (RuleKind::BaseFieldWrapper { field }, Matcher::Exact(message), rationale)
            }
            Self::OneofWrapper { message, members, rationale } => {
                if members.is_empty() {
                    return Err(ConfigError::InvalidPattern {
                        pattern: message,
                        reason: "oneof wrapper without members".to_string(),
                    });
                }
                for member in &members {
                    validate_name(member)?;
                }
                let members = members.into_iter().collect();
                (RuleKind::OneofWrapper { members }, Matcher::Exact(message), rationale)
            }
            Self::LeafMessage { message, rationale } => (RuleKind::LeafMessage, Matcher::Exact(message), rationale),
        };

        if kind.suppresses_subtree() {
            validate_path_pattern(matcher.pattern())?;
        } else {
            validate_name(matcher.pattern())?;
        }
        Ok(SuppressionRule { kind, matcher, rationale })
    }
}

/// Names (fields, messages) are single segments without wildcards.
fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.contains('.') || name.contains('*') {
        return Err(ConfigError::InvalidPattern {
            pattern: name.to_string(),
            reason: "expected a plain name".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable set of suppression rules with indexed lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionRegistry {
    rules: Vec<SuppressionRule>,
    aliases: BTreeMap<String, String>,
    base_wrappers: BTreeMap<String, String>,
    oneof_wrappers: BTreeMap<String, BTreeSet<String>>,
    leaves: BTreeSet<String>,
}

impl SuppressionRegistry {
    /// A registry with no rules: everything falls to default policy.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry. Two rules of the same kind on the same subject are
    /// rejected.
    pub fn new(rules: Vec<SuppressionRule>) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        let mut seen: BTreeSet<(&'static str, String)> = BTreeSet::new();
        for rule in &rules {
            let subject = rule.matcher.pattern().to_string();
            if !seen.insert((rule.kind.name(), subject.clone())) {
                return Err(ConfigError::DuplicateRule {
                    kind: rule.kind.name().to_string(),
                    subject,
                });
            }
            match &rule.kind {
                RuleKind::FieldAlias { wire } => {
                    registry.aliases.insert(subject, wire.clone());
                }
                RuleKind::BaseFieldWrapper { field } => {
                    registry.base_wrappers.insert(subject, field.clone());
                }
                RuleKind::OneofWrapper { members } => {
                    registry.oneof_wrappers.insert(subject, members.clone());
                }
                RuleKind::LeafMessage => {
                    registry.leaves.insert(subject);
                }
                RuleKind::CustomFieldPrefix | RuleKind::ProtoOnlyPrefix | RuleKind::EnumFallbackSuffix => {}
            }
        }
        registry.rules = rules;
        Ok(registry)
    }

    /// All rules in declaration order.
    pub fn rules(&self) -> &[SuppressionRule] {
        &self.rules
    }

    /// The wire field name a domain field is aliased to.
    pub fn wire_alias(&self, domain_field: &str) -> Option<&str> {
        self.aliases.get(domain_field).map(String::as_str)
    }

    /// The first rule suppressing the subtree at `path`.
    pub fn subtree_rule(&self, path: &FieldPath) -> Option<&SuppressionRule> {
        self.rules
            .iter()
            .find(|rule| rule.kind.suppresses_subtree() && rule.matcher.matches_path(path))
    }

    /// The base field to flatten for a wire message.
    pub fn base_wrapper_field(&self, message: &str) -> Option<&str> {
        self.base_wrappers.get(message).map(String::as_str)
    }

    /// Members of a oneof-wrapper wire message.
    pub fn oneof_wrapper_members(&self, message: &str) -> Option<&BTreeSet<String>> {
        self.oneof_wrappers.get(message)
    }

    /// Whether `wrapper` is a oneof wrapper over `member`.
    pub fn wraps(&self, wrapper: &str, member: &str) -> bool {
        self.oneof_wrappers
            .get(wrapper)
            .is_some_and(|members| members.contains(member))
    }

    /// Whether descent stops at this wire message.
    pub fn is_leaf_message(&self, message: &str) -> bool {
        self.leaves.contains(message)
    }
}
