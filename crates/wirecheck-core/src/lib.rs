#![deny(missing_docs)]

//! # wirecheck-core: Foundational Types for wirecheck
//!
//! This crate defines the side-neutral vocabulary shared by every other crate
//! in the workspace. It has no internal crate dependencies, only `serde`,
//! `serde_json`, `serde_yaml`, `thiserror`, and `sha2` from the external
//! ecosystem.
//!
//! ## Design Principles
//!
//! 1. **One closed type algebra.** [`CanonicalType`] is the only type
//!    representation the comparator ever sees. Both the domain schema and the
//!    wire schema are normalized into it before any comparison happens, so
//!    every compatibility rule is an exhaustive `match` over variant pairs.
//!
//! 2. **Paths are newtypes.** [`FieldPath`] is the only way to address a node
//!    in either schema tree. No ad hoc string concatenation of dotted paths.
//!
//! 3. **Schema trees are immutable tables.** [`SchemaTree`] is built once by
//!    an extractor and then only read.
//!
//! 4. **[`WirecheckError`] hierarchy.** Structured errors with `thiserror`,
//!    no `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod canonical;
pub mod descriptor;
pub mod digest;
pub mod error;
pub mod path;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::{CanonicalType, PrimitiveKind};
pub use descriptor::{FieldDescriptor, SchemaNode, SchemaTree, Side};
pub use digest::{sha256_hex, ReportDigest};
pub use error::{CanonicalizationError, ConfigError, WirecheckError};
pub use path::FieldPath;
