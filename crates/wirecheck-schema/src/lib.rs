//! # wirecheck-schema: Domain ⇄ Wire Schema Compatibility
//!
//! Validates, once at service startup, that an object-model ("domain")
//! schema and a wire-format ("wire") schema describe the same data closely
//! enough that converting between them cannot silently lose information.
//!
//! ## Pipeline
//!
//! 1. [`domain::extract_domain`] and [`wire::extract_wire`] load each side's
//!    definition into an immutable [`SchemaTree`](wirecheck_core::SchemaTree),
//!    canonicalizing every declared type ([`canonicalize`]).
//! 2. [`compare::Comparator`] walks both trees in lockstep and asks the
//!    [`compat::CompatibilityEngine`] to classify every paired field.
//! 3. [`report::Report`] partitions the findings into OK / INFO / WARN /
//!    FAIL and decides the startup outcome.
//!
//! Known, intentional divergences live in configuration, never in code:
//! the suppression rules ([`rules`]) and the coercion allowlist
//! ([`coercion`]) are loaded together from a registry file ([`config`]).
//!
//! ## Crate Policy
//!
//! - Depends only on `wirecheck-core` internally.
//! - Only canonicalization errors abort a run. Every compatibility defect
//!   is collected as a finding for the whole traversal.
//! - Output is deterministic: traversal follows sorted field names and the
//!   report digest is stable across runs on unchanged inputs.

pub mod canonicalize;
pub mod coercion;
pub mod compare;
pub mod compat;
pub mod config;
pub mod domain;
pub mod finding;
pub mod report;
pub mod rules;
pub mod typeexpr;
pub mod validator;
pub mod wire;

pub use coercion::{AllowedCoercion, CoercionList, TypePattern};
pub use compare::{Comparator, Comparison, TraversalStats};
pub use config::{Policy, RegistryConfig, DEFAULT_MAX_DEPTH, DEFAULT_REGISTRY_YAML};
pub use domain::{extract_domain, DomainSchemaDef, DomainSource};
pub use finding::{Finding, FindingKind, Severity};
pub use report::{Baseline, Report, SeverityCounts, ValidationFailure, ValidationSummary};
pub use rules::{RuleKind, SuppressionRegistry, SuppressionRule};
pub use validator::{validate_at_startup, SchemaValidator, StartupError};
pub use wire::{extract_wire, WireReflection, WireSchemaDef};
