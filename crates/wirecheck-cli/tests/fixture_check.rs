//! Integration test: run the CLI handlers against the document-model fixture.

use std::path::PathBuf;

use wirecheck_cli::baseline::{run_baseline, BaselineArgs};
use wirecheck_cli::check::{run_check, CheckArgs, ReportFormat};
use wirecheck_cli::{RegistryInputs, SchemaInputs, EXIT_INCOMPATIBLE};

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn fixture_inputs(registry: RegistryInputs) -> SchemaInputs {
    let fixtures = repo_root().join("fixtures").join("docling");
    SchemaInputs {
        domain: fixtures.join("domain.yaml"),
        wire: fixtures.join("wire.yaml"),
        registry,
    }
}

#[test]
fn test_fixture_check_passes_with_builtin_registry() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("report.json");
    let args = CheckArgs {
        inputs: fixture_inputs(RegistryInputs::default()),
        baseline: None,
        format: ReportFormat::Json,
        output: Some(output.clone()),
    };
    assert_eq!(run_check(&args).unwrap(), 0);

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["domain_root"], "DoclingDocument");
    assert_eq!(report["counts"]["fail"], 0);
    assert_eq!(report["counts"]["warn"], 0);
    assert_eq!(report["counts"]["info"], 10);
    assert_eq!(report["baseline_applied"], false);
}

#[test]
fn test_fixture_check_fails_with_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("empty.yaml");
    std::fs::write(&registry, "{}\n").unwrap();
    let args = CheckArgs {
        inputs: fixture_inputs(RegistryInputs {
            registry: Some(registry),
            max_depth: None,
        }),
        baseline: None,
        format: ReportFormat::Table,
        output: Some(dir.path().join("report.txt")),
    };
    assert_eq!(run_check(&args).unwrap(), EXIT_INCOMPATIBLE);
    let table = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert!(table.contains("FAIL  texts"));
}

#[test]
fn test_baseline_then_check_has_no_unclassified_paths() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let record = BaselineArgs {
        inputs: fixture_inputs(RegistryInputs::default()),
        out: baseline.clone(),
    };
    assert_eq!(run_baseline(&record).unwrap(), 0);

    let output = dir.path().join("report.json");
    let check = CheckArgs {
        inputs: fixture_inputs(RegistryInputs::default()),
        baseline: Some(baseline),
        format: ReportFormat::Json,
        output: Some(output.clone()),
    };
    assert_eq!(run_check(&check).unwrap(), 0);
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["baseline_applied"], true);
    let findings = report["findings"].as_array().unwrap();
    assert!(findings.iter().all(|f| f.get("new_path").is_none()));
}
