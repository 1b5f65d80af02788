//! # Error Hierarchy
//!
//! Structured error types for wirecheck, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Only [`CanonicalizationError`] and [`ConfigError`] are *errors* in the
//! control-flow sense: they abort a run before any comparison can happen.
//! Compatibility defects (missing fields, mismatches) are findings, not
//! errors, and are collected for the whole traversal.

use thiserror::Error;

use crate::descriptor::Side;

/// Top-level error type for wirecheck.
#[derive(Error, Debug)]
pub enum WirecheckError {
    /// A native type could not be classified into the canonical algebra.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Registry or allowlist configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A native type on either side cannot be expressed canonically.
///
/// Always fatal: without a canonical type no comparison is possible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// A domain-side type expression has no canonical form.
    #[error("unsupported domain type at {context}: {detail}")]
    UnsupportedDomainType {
        /// Model and field being canonicalized.
        context: String,
        /// What made the type unsupported.
        detail: String,
    },

    /// A wire-side field type has no canonical form.
    #[error("unsupported wire type at {context}: {detail}")]
    UnsupportedWireType {
        /// Message and field being canonicalized.
        context: String,
        /// What made the type unsupported.
        detail: String,
    },

    /// A message flagged as a map entry does not have exactly `key` and `value`.
    #[error("malformed map entry {message}: {detail}")]
    MalformedMapEntry {
        /// The map-entry message name.
        message: String,
        /// What is wrong with it.
        detail: String,
    },

    /// A type name refers to nothing declared on its side.
    #[error("unknown {side} type reference \"{name}\" at {context}")]
    UnknownReference {
        /// Side on which the reference was made.
        side: Side,
        /// The unresolved name.
        name: String,
        /// Where the reference was made.
        context: String,
    },

    /// A domain type expression is syntactically invalid.
    #[error("invalid type expression \"{expr}\" at {context}: {detail}")]
    TypeExprSyntax {
        /// The offending expression text.
        expr: String,
        /// Where it was declared.
        context: String,
        /// Parser diagnostic.
        detail: String,
    },
}

/// Errors in the static registry / allowlist configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A path matcher is malformed.
    #[error("invalid path pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A type pattern in an allowlist entry is malformed.
    #[error("invalid type pattern \"{pattern}\": {reason}")]
    InvalidTypePattern {
        /// The pattern as written.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two rules claim the same subject with conflicting meaning.
    #[error("duplicate {kind} rule for \"{subject}\"")]
    DuplicateRule {
        /// Rule kind name.
        kind: String,
        /// The contested subject (field, message, or path).
        subject: String,
    },
}
