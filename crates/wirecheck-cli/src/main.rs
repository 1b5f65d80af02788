//! # wirecheck CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wirecheck_cli::baseline::{run_baseline, BaselineArgs};
use wirecheck_cli::check::{run_check, CheckArgs};
use wirecheck_cli::rules::{run_rules, RulesArgs};
use wirecheck_cli::EXIT_ERROR;

/// Domain/wire schema compatibility checker.
///
/// Compares an object-model schema with its wire-format schema and fails
/// when converting between them could lose information.
#[derive(Parser, Debug)]
#[command(name = "wirecheck", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a domain schema with a wire schema and report findings.
    Check(CheckArgs),

    /// Record the compared paths of an accepted run.
    Baseline(BaselineArgs),

    /// List the active suppression rules and allowed coercions.
    Rules(RulesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("wirecheck CLI starting");

    let result = match cli.command {
        Commands::Check(args) => run_check(&args),
        Commands::Baseline(args) => run_baseline(&args),
        Commands::Rules(args) => run_rules(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use wirecheck_cli::check::ReportFormat;

    #[test]
    fn cli_parse_check_defaults() {
        let cli = Cli::try_parse_from(["wirecheck", "check", "--domain", "d.yaml", "--wire", "w.yaml"]).unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.inputs.domain, PathBuf::from("d.yaml"));
        assert_eq!(args.inputs.wire, PathBuf::from("w.yaml"));
        assert_eq!(args.format, ReportFormat::Table);
        assert!(args.inputs.registry.registry.is_none());
        assert!(args.inputs.registry.max_depth.is_none());
        assert!(args.baseline.is_none());
    }

    #[test]
    fn cli_parse_check_all_options() {
        let cli = Cli::try_parse_from([
            "wirecheck",
            "check",
            "--domain",
            "d.yaml",
            "--wire",
            "w.yaml",
            "--registry",
            "r.yaml",
            "--baseline",
            "b.json",
            "--max-depth",
            "8",
            "--format",
            "json",
            "--output",
            "report.json",
        ])
        .unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.inputs.registry.registry, Some(PathBuf::from("r.yaml")));
        assert_eq!(args.inputs.registry.max_depth, Some(8));
        assert_eq!(args.baseline, Some(PathBuf::from("b.json")));
        assert_eq!(args.format, ReportFormat::Json);
        assert_eq!(args.output, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn cli_parse_baseline_requires_out() {
        assert!(Cli::try_parse_from(["wirecheck", "baseline", "--domain", "d", "--wire", "w"]).is_err());
        let cli =
            Cli::try_parse_from(["wirecheck", "baseline", "--domain", "d", "--wire", "w", "--out", "b.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Baseline(_)));
    }

    #[test]
    fn cli_parse_rules() {
        let cli = Cli::try_parse_from(["wirecheck", "rules"]).unwrap();
        assert!(matches!(cli.command, Commands::Rules(_)));
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli0 = Cli::try_parse_from(["wirecheck", "rules"]).unwrap();
        assert_eq!(cli0.verbose, 0);
        let cli2 = Cli::try_parse_from(["wirecheck", "-vv", "rules"]).unwrap();
        assert_eq!(cli2.verbose, 2);
    }

    #[test]
    fn cli_parse_rejects_unknown_format() {
        let result = Cli::try_parse_from(["wirecheck", "check", "--domain", "d", "--wire", "w", "--format", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["wirecheck"]).is_err());
    }
}
