//! # Baseline Subcommand
//!
//! Records the compared paths of an accepted run so later checks can call
//! out drift on paths nobody has classified yet. A run with FAIL findings is
//! not accepted and writes nothing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use wirecheck_schema::Baseline;

use crate::check::build_report;
use crate::{SchemaInputs, EXIT_INCOMPATIBLE};

/// Arguments for the baseline subcommand.
#[derive(Args, Debug)]
pub struct BaselineArgs {
    #[command(flatten)]
    pub inputs: SchemaInputs,

    /// Where to write the baseline JSON.
    #[arg(long)]
    pub out: PathBuf,
}

/// Execute the baseline subcommand.
pub fn run_baseline(args: &BaselineArgs) -> Result<u8> {
    let report = build_report(&args.inputs, None)?;
    report.log_summary();
    if report.is_failure() {
        eprint!("{}", report.render_table());
        eprintln!("refusing to record a baseline for an incompatible run");
        return Ok(EXIT_INCOMPATIBLE);
    }

    let baseline = Baseline::from_report(&report);
    baseline
        .save(&args.out)
        .with_context(|| format!("failed to write baseline: {}", args.out.display()))?;
    println!("  paths:    {}", baseline.paths.len());
    println!("  baseline: {}", args.out.display());
    Ok(0)
}
