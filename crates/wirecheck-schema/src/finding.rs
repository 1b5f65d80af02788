//! # Findings
//!
//! One [`Finding`] per compared path per run. A finding's [`Severity`] is a
//! pure function of its [`FindingKind`]; findings are never mutated after the
//! comparator emits them, except for the baseline's `new_path` flag.

use std::fmt;

use serde::{Deserialize, Serialize};

use wirecheck_core::{CanonicalType, FieldPath, Side};

/// How serious a finding is. Ordered from benign to fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Compatible.
    Ok,
    /// Known, allowlisted divergence.
    Info,
    /// Tolerated drift; logged, never fatal.
    Warn,
    /// Breaking incompatibility; aborts startup.
    Fail,
}

impl Severity {
    /// Upper-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the comparator concluded at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Types agree.
    Compatible,
    /// Types differ nominally but are structurally equivalent.
    StructuralEquivalence,
    /// Types differ, covered by an allowlist entry.
    AllowedCoercion,
    /// Field present on one side only.
    MissingField,
    /// Types agree but one side tracks presence and the other does not.
    PresenceMismatch,
    /// Wire is list/map/union shaped and the domain is not.
    CardinalityMismatch,
    /// Types are incompatible and nothing allows it.
    TypeMismatch,
}

impl FindingKind {
    /// The fixed severity of this kind.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Compatible | Self::StructuralEquivalence => Severity::Ok,
            Self::AllowedCoercion => Severity::Info,
            Self::MissingField | Self::PresenceMismatch => Severity::Warn,
            Self::CardinalityMismatch | Self::TypeMismatch => Severity::Fail,
        }
    }

    /// Short human reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Compatible => "compatible",
            Self::StructuralEquivalence => "structural equivalence",
            Self::AllowedCoercion => "allowed coercion",
            Self::MissingField => "missing field",
            Self::PresenceMismatch => "presence mismatch",
            Self::CardinalityMismatch => "cardinality mismatch",
            Self::TypeMismatch => "type mismatch",
        }
    }

    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compatible => "compatible",
            Self::StructuralEquivalence => "structural_equivalence",
            Self::AllowedCoercion => "allowed_coercion",
            Self::MissingField => "missing_field",
            Self::PresenceMismatch => "presence_mismatch",
            Self::CardinalityMismatch => "cardinality_mismatch",
            Self::TypeMismatch => "type_mismatch",
        }
    }
}

/// The per-path outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Root-relative path.
    pub path: FieldPath,
    /// Severity, derived from `kind`.
    pub severity: Severity,
    /// Classification.
    pub kind: FindingKind,
    /// Short reason.
    pub reason: String,
    /// Human-readable specifics.
    pub detail: String,
    /// Canonical domain type, when the field exists on the domain side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<String>,
    /// Canonical wire type, when the field exists on the wire side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_type: Option<String>,
    /// Set when a baseline was supplied and did not contain this path.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub new_path: bool,
}

impl Finding {
    /// A finding of `kind` at `path`.
    pub fn new(path: FieldPath, kind: FindingKind, detail: impl Into<String>) -> Self {
        Self {
            path,
            severity: kind.severity(),
            kind,
            reason: kind.reason().to_string(),
            detail: detail.into(),
            domain_type: None,
            wire_type: None,
            new_path: false,
        }
    }

    /// A missing-field finding for a field that only `present_on` declares.
    pub fn missing(path: FieldPath, present_on: Side, ty: &CanonicalType) -> Self {
        let detail = format!("present on {present_on} only, absent on {}", present_on.opposite());
        let finding = Self::new(path, FindingKind::MissingField, detail);
        match present_on {
            Side::Domain => finding.with_domain_type(ty),
            Side::Wire => finding.with_wire_type(ty),
        }
    }

    /// Record the domain-side canonical type.
    pub fn with_domain_type(mut self, ty: &CanonicalType) -> Self {
        self.domain_type = Some(ty.to_string());
        self
    }

    /// Record the wire-side canonical type.
    pub fn with_wire_type(mut self, ty: &CanonicalType) -> Self {
        self.wire_type = Some(ty.to_string());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} ({})", self.severity, self.path, self.reason, self.detail)
    }
}
