//! # Reporting
//!
//! A [`Report`] is the ordered, severity-partitioned result of one run. It
//! renders as a fixed-width table or as pretty JSON, and its digest is the
//! SHA-256 of that JSON so two runs over unchanged inputs can be compared
//! byte for byte.
//!
//! [`Report::into_outcome`] turns the report into the startup decision:
//! any FAIL finding is a [`ValidationFailure`] carrying the full FAIL list,
//! otherwise a [`ValidationSummary`] carrying the WARN and INFO findings.
//!
//! A [`Baseline`] is the set of compared paths of a prior accepted run.
//! WARN/FAIL findings outside it are flagged `new_path` and listed in their
//! own section; their severity is unchanged.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};

use wirecheck_core::{FieldPath, ReportDigest, WirecheckError};

use crate::compare::{Comparison, TraversalStats};
use crate::finding::{Finding, Severity};

/// Finding totals per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Compatible paths.
    pub ok: usize,
    /// Allowed coercions.
    pub info: usize,
    /// Tolerated drift.
    pub warn: usize,
    /// Breaking incompatibilities.
    pub fail: usize,
}

impl SeverityCounts {
    fn tally<'f>(findings: impl IntoIterator<Item = &'f Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Ok => counts.ok += 1,
                Severity::Info => counts.info += 1,
                Severity::Warn => counts.warn += 1,
                Severity::Fail => counts.fail += 1,
            }
        }
        counts
    }
}

impl fmt::Display for SeverityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ok, {} info, {} warn, {} fail", self.ok, self.info, self.warn, self.fail)
    }
}

/// The full result of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Root model of the domain schema.
    pub domain_root: String,
    /// Root message of the wire schema.
    pub wire_root: String,
    /// Totals per severity.
    pub counts: SeverityCounts,
    /// Every finding, in traversal order.
    pub findings: Vec<Finding>,
    /// Traversal counters.
    pub stats: TraversalStats,
    /// Whether a baseline was applied.
    pub baseline_applied: bool,
}

impl Report {
    /// Wrap one comparator run.
    pub fn new(domain_root: impl Into<String>, wire_root: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            domain_root: domain_root.into(),
            wire_root: wire_root.into(),
            counts: SeverityCounts::tally(&comparison.findings),
            findings: comparison.findings,
            stats: comparison.stats,
            baseline_applied: false,
        }
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// WARN findings.
    pub fn missing(&self) -> Vec<&Finding> {
        self.with_severity(Severity::Warn).collect()
    }

    /// FAIL findings.
    pub fn mismatched(&self) -> Vec<&Finding> {
        self.with_severity(Severity::Fail).collect()
    }

    /// INFO findings.
    pub fn coerced(&self) -> Vec<&Finding> {
        self.with_severity(Severity::Info).collect()
    }

    /// Findings flagged by the baseline as new.
    pub fn unclassified(&self) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.new_path).collect()
    }

    /// Every path that produced a finding, sorted.
    pub fn compared_paths(&self) -> BTreeSet<FieldPath> {
        self.findings.iter().map(|f| f.path.clone()).collect()
    }

    /// Whether the run is a hard failure.
    pub fn is_failure(&self) -> bool {
        self.counts.fail > 0
    }

    /// Flag WARN/FAIL findings whose path the baseline does not contain.
    pub fn apply_baseline(&mut self, baseline: &Baseline) {
        for finding in &mut self.findings {
            finding.new_path = finding.severity >= Severity::Warn && !baseline.contains(&finding.path);
        }
        self.baseline_applied = true;
    }

    /// Emit one log event per non-OK finding plus a summary line.
    pub fn log_summary(&self) {
        for finding in &self.findings {
            match finding.severity {
                Severity::Ok => {}
                Severity::Info => tracing::info!(path = %finding.path, detail = %finding.detail, "allowed coercion"),
                Severity::Warn => tracing::warn!(
                    path = %finding.path,
                    kind = finding.kind.as_str(),
                    new_path = finding.new_path,
                    detail = %finding.detail,
                    "schema drift"
                ),
                Severity::Fail => tracing::error!(
                    path = %finding.path,
                    kind = finding.kind.as_str(),
                    domain_type = finding.domain_type.as_deref().unwrap_or("-"),
                    wire_type = finding.wire_type.as_deref().unwrap_or("-"),
                    detail = %finding.detail,
                    "schema incompatibility"
                ),
            }
        }
        tracing::info!(
            domain_root = %self.domain_root,
            wire_root = %self.wire_root,
            ok = self.counts.ok,
            info = self.counts.info,
            warn = self.counts.warn,
            fail = self.counts.fail,
            truncated = self.stats.truncated,
            suppressed = self.stats.suppressed,
            "schema validation finished"
        );
    }

    /// Fixed-width text rendering of the non-OK findings.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "schema compatibility: {} <-> {}", self.domain_root, self.wire_root);
        let rows: Vec<&Finding> = [Severity::Fail, Severity::Warn, Severity::Info]
            .into_iter()
            .flat_map(|s| self.with_severity(s))
            .collect();
        if !rows.is_empty() {
            let width = rows.iter().map(|f| f.path.as_str().len()).max().unwrap_or(0).max(4);
            let _ = writeln!(out);
            let _ = writeln!(out, "{:<5} {:<width$} {:<22} DETAIL", "SEV", "PATH", "REASON");
            for f in &rows {
                let _ = writeln!(out, "{:<5} {:<width$} {:<22} {}", f.severity.as_str(), f.path.as_str(), f.reason, f.detail);
            }
        }
        let unclassified = self.unclassified();
        if !unclassified.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "unclassified new paths ({}):", unclassified.len());
            for f in unclassified {
                let _ = writeln!(out, "  {} [{}]", f.path, f.severity);
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "totals: {} ({} truncated, {} suppressed)",
            self.counts, self.stats.truncated, self.stats.suppressed
        );
        out
    }

    /// Pretty, deterministic JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 of [`Report::to_json`].
    pub fn digest(&self) -> Result<ReportDigest, serde_json::Error> {
        Ok(ReportDigest::of(self.to_json()?.as_bytes()))
    }

    /// The startup decision for this report.
    pub fn into_outcome(self) -> Result<ValidationSummary, ValidationFailure> {
        let counts = self.counts;
        let stats = self.stats;
        let mut summary = ValidationSummary {
            counts,
            stats,
            warnings: Vec::new(),
            coerced: Vec::new(),
            unclassified: Vec::new(),
        };
        let mut failures = Vec::new();
        for finding in self.findings {
            if finding.new_path {
                summary.unclassified.push(finding.path.clone());
            }
            match finding.severity {
                Severity::Ok => {}
                Severity::Info => summary.coerced.push(finding),
                Severity::Warn => summary.warnings.push(finding),
                Severity::Fail => failures.push(finding),
            }
        }
        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(ValidationFailure { failures, summary })
        }
    }
}

/// Successful outcome: tolerated drift and allowlisted coercions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Totals per severity.
    pub counts: SeverityCounts,
    /// Traversal counters.
    pub stats: TraversalStats,
    /// WARN findings.
    pub warnings: Vec<Finding>,
    /// INFO findings.
    pub coerced: Vec<Finding>,
    /// Paths the baseline did not contain.
    pub unclassified: Vec<FieldPath>,
}

/// Hard failure: at least one FAIL finding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema validation failed with {} type mismatch(es): {}", .failures.len(), failure_list(.failures))]
pub struct ValidationFailure {
    /// Every FAIL finding.
    pub failures: Vec<Finding>,
    /// WARN/INFO findings from the same run.
    pub summary: ValidationSummary,
}

fn failure_list(failures: &[Finding]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.path, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compared paths of a prior accepted run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    /// Sorted path set.
    pub paths: BTreeSet<FieldPath>,
}

impl Baseline {
    /// The compared paths of `report`.
    pub fn from_report(report: &Report) -> Self {
        Self {
            paths: report.compared_paths(),
        }
    }

    /// Whether `path` was compared in the baseline run.
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.paths.contains(path)
    }

    /// Parse baseline JSON.
    pub fn from_json_str(input: &str) -> Result<Self, WirecheckError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read a baseline file.
    pub fn load(path: &Path) -> Result<Self, WirecheckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Write the baseline as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), WirecheckError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FindingKind;
    use wirecheck_core::{CanonicalType, Side};

    fn sample() -> Report {
        let findings = vec![
            Finding::new(FieldPath::parse("name"), FindingKind::Compatible, "identical"),
            Finding::missing(FieldPath::parse("extra"), Side::Domain, &CanonicalType::string()),
            Finding::new(FieldPath::parse("label"), FindingKind::AllowedCoercion, "enum -> string"),
        ];
        Report::new(
            "Doc",
            "Doc",
            Comparison {
                findings,
                stats: TraversalStats::default(),
            },
        )
    }

    fn failing() -> Report {
        let mut report = sample();
        report.findings.push(Finding::new(FieldPath::parse("items"), FindingKind::CardinalityMismatch, "list vs message"));
        report.counts = SeverityCounts::tally(&report.findings);
        report
    }

    #[test]
    fn partitions_by_severity() {
        let report = sample();
        assert_eq!(report.missing().len(), 1);
        assert_eq!(report.coerced().len(), 1);
        assert!(report.mismatched().is_empty());
        assert_eq!(report.counts, SeverityCounts { ok: 1, info: 1, warn: 1, fail: 0 });
        assert!(!report.is_failure());
    }

    #[test]
    fn warnings_do_not_fail_the_outcome() {
        let summary = sample().into_outcome().unwrap();
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.coerced.len(), 1);
    }

    #[test]
    fn failures_carry_the_full_list() {
        let failure = failing().into_outcome().unwrap_err();
        assert_eq!(failure.failures.len(), 1);
        assert_eq!(failure.summary.warnings.len(), 1);
        assert_eq!(
            failure.to_string(),
            "schema validation failed with 1 type mismatch(es): items (cardinality mismatch)"
        );
    }

    #[test]
    fn baseline_flags_only_new_drift() {
        let mut report = failing();
        let baseline = Baseline {
            paths: [FieldPath::parse("extra")].into_iter().collect(),
        };
        report.apply_baseline(&baseline);
        let new: Vec<&str> = report.unclassified().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(new, vec!["items"]);
        assert!(report.render_table().contains("unclassified new paths (1):"));
    }

    #[test]
    fn table_orders_fail_before_warn() {
        let table = failing().render_table();
        let fail = table.find("FAIL").unwrap();
        let warn = table.find("WARN").unwrap();
        assert!(fail < warn);
        assert!(table.contains("totals: 1 ok, 1 info, 1 warn, 1 fail"));
    }

    #[test]
    fn digest_is_stable() {
        assert_eq!(sample().digest().unwrap(), sample().digest().unwrap());
        assert_ne!(sample().digest().unwrap(), failing().digest().unwrap());
    }

    #[test]
    fn baseline_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let baseline = Baseline::from_report(&sample());
        baseline.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"paths\""));
        assert_eq!(Baseline::load(&path).unwrap(), baseline);
    }
}
