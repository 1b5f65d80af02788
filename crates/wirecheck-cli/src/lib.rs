//! # wirecheck-cli: Command-Line Front End
//!
//! Runs the same startup check a service performs, from CI or a terminal.
//!
//! ## Subcommands
//!
//! - `wirecheck check`: Compare a domain schema with a wire schema.
//!   Exit 0 on success, 1 on a hard failure, 2 on an operational error.
//! - `wirecheck baseline`: Record the compared paths of an accepted run.
//! - `wirecheck rules`: List the active suppression rules and coercions.
//!
//! ```bash
//! wirecheck check --domain fixtures/docling/domain.yaml --wire fixtures/docling/wire.yaml
//! wirecheck baseline --domain domain.yaml --wire wire.yaml --out baseline.json
//! wirecheck check --domain domain.yaml --wire wire.yaml --baseline baseline.json --format json
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here. Comparison logic lives in `wirecheck-schema`.
//! - Handlers return `anyhow::Result<u8>`; the binary maps `Err` to exit code 2.

pub mod baseline;
pub mod check;
pub mod rules;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use wirecheck_schema::{DomainSchemaDef, Policy, RegistryConfig, WireSchemaDef};

/// Exit code of a run whose schemas are incompatible.
pub const EXIT_INCOMPATIBLE: u8 = 1;

/// Exit code of a run that could not complete.
pub const EXIT_ERROR: u8 = 2;

/// Inputs shared by every subcommand that runs a comparison.
#[derive(Args, Debug, Clone)]
pub struct SchemaInputs {
    /// Domain schema definition (YAML or JSON).
    #[arg(long)]
    pub domain: PathBuf,

    /// Wire schema definition (YAML or JSON).
    #[arg(long)]
    pub wire: PathBuf,

    #[command(flatten)]
    pub registry: RegistryInputs,
}

impl SchemaInputs {
    /// Load both schema definitions.
    pub fn load(&self) -> Result<(DomainSchemaDef, WireSchemaDef)> {
        let domain = DomainSchemaDef::from_path(&self.domain)
            .with_context(|| format!("failed to load domain schema: {}", self.domain.display()))?;
        let wire = WireSchemaDef::from_path(&self.wire)
            .with_context(|| format!("failed to load wire schema: {}", self.wire.display()))?;
        Ok((domain, wire))
    }
}

/// Registry selection and overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryInputs {
    /// Registry file with suppressions and coercions. Defaults to the
    /// built-in document-model registry.
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Override the nested message depth bound.
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl RegistryInputs {
    /// Load, compile and apply overrides.
    pub fn policy(&self) -> Result<Policy> {
        let config = match &self.registry {
            Some(path) => load_registry(path)?,
            None => RegistryConfig::builtin().context("built-in registry is invalid")?,
        };
        let policy = config.compile().context("failed to compile registry")?;
        Ok(match self.max_depth {
            Some(depth) => policy.with_max_depth(depth),
            None => policy,
        })
    }
}

fn load_registry(path: &Path) -> Result<RegistryConfig> {
    RegistryConfig::from_path(path).with_context(|| format!("failed to load registry: {}", path.display()))
}
