//! # Check Subcommand
//!
//! Runs the startup compatibility check and renders the report.
//!
//! ```bash
//! wirecheck check --domain domain.yaml --wire wire.yaml [--registry r.yaml] \
//!     [--baseline baseline.json] [--max-depth 16] [--format table|json] [--output report.json]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use wirecheck_schema::{Baseline, Report, SchemaValidator};

use crate::{SchemaInputs, EXIT_INCOMPATIBLE};

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub inputs: SchemaInputs,

    /// Baseline of a previously accepted run; drift outside it is listed as
    /// unclassified.
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value = "table")]
    pub format: ReportFormat,

    /// Write the report to a file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Report renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Fixed-width text table of non-OK findings.
    Table,
    /// Pretty JSON of the full report.
    Json,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let report = build_report(&args.inputs, args.baseline.as_deref())?;
    report.log_summary();

    let digest = report.digest().context("failed to serialize report")?;
    tracing::info!(%digest, "report digest");

    let rendered = match args.format {
        ReportFormat::Table => report.render_table(),
        ReportFormat::Json => {
            let mut json = report.to_json().context("failed to serialize report")?;
            json.push('\n');
            json
        }
    };
    match &args.output {
        Some(path) => std::fs::write(path, &rendered)
            .with_context(|| format!("failed to write report: {}", path.display()))?,
        None => print!("{rendered}"),
    }

    if report.is_failure() {
        Ok(EXIT_INCOMPATIBLE)
    } else {
        Ok(0)
    }
}

/// Load everything and run one comparison.
pub(crate) fn build_report(inputs: &SchemaInputs, baseline: Option<&std::path::Path>) -> Result<Report> {
    let policy = inputs.registry.policy()?;
    let (domain, wire) = inputs.load()?;
    let baseline = baseline
        .map(|path| {
            Baseline::load(path).with_context(|| format!("failed to load baseline: {}", path.display()))
        })
        .transpose()?;

    SchemaValidator::new(&policy)
        .with_baseline(baseline.as_ref())
        .run(&domain, &wire)
        .context("failed to canonicalize schemas")
}
