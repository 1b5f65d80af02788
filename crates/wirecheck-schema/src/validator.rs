//! # Startup Validator
//!
//! Glue between the extractors, the comparator and the reporter. A service
//! calls [`validate_at_startup`] once before it begins serving; an `Err`
//! means it must not start.

use wirecheck_core::{CanonicalizationError, WirecheckError};

use crate::compare::Comparator;
use crate::config::Policy;
use crate::domain::{extract_domain, DomainSource};
use crate::report::{Baseline, Report, ValidationFailure, ValidationSummary};
use crate::wire::{extract_wire, WireReflection};

/// One configured validation run.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'a> {
    policy: &'a Policy,
    baseline: Option<&'a Baseline>,
}

impl<'a> SchemaValidator<'a> {
    /// A validator under `policy`, without a baseline.
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, baseline: None }
    }

    /// Flag findings outside `baseline` as new paths.
    pub fn with_baseline(mut self, baseline: Option<&'a Baseline>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Extract both trees, compare them, and build the report.
    ///
    /// Only canonicalization aborts; every compatibility defect becomes a
    /// finding in the returned report.
    pub fn run<D, W>(&self, domain: &D, wire: &W) -> Result<Report, CanonicalizationError>
    where
        D: DomainSource + ?Sized,
        W: WireReflection + ?Sized,
    {
        let domain_tree = extract_domain(domain)?;
        let wire_tree = extract_wire(wire)?;
        tracing::debug!(
            domain_root = %domain_tree.root,
            wire_root = %wire_tree.root,
            domain_fields = domain_tree.field_count(),
            wire_fields = wire_tree.field_count(),
            "extracted schema trees"
        );

        let comparison = Comparator::new(&domain_tree, &wire_tree, self.policy).run();
        let mut report = Report::new(&domain_tree.root, &wire_tree.root, comparison);
        if let Some(baseline) = self.baseline {
            report.apply_baseline(baseline);
        }
        Ok(report)
    }
}

/// Why a service must not start.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The schemas could not be loaded or canonicalized.
    #[error(transparent)]
    Setup(#[from] WirecheckError),

    /// The schemas are incompatible.
    #[error(transparent)]
    Incompatible(#[from] ValidationFailure),
}

/// Validate `domain` against `wire` and log the result.
pub fn validate_at_startup<D, W>(
    domain: &D,
    wire: &W,
    policy: &Policy,
    baseline: Option<&Baseline>,
) -> Result<ValidationSummary, StartupError>
where
    D: DomainSource + ?Sized,
    W: WireReflection + ?Sized,
{
    let report = SchemaValidator::new(policy)
        .with_baseline(baseline)
        .run(domain, wire)
        .map_err(WirecheckError::from)?;
    report.log_summary();
    Ok(report.into_outcome()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainSchemaDef;
    use crate::finding::FindingKind;
    use crate::wire::WireSchemaDef;

    const DOMAIN: &str = r#"
root: Doc
models:
  Doc:
    fields:
      - { name: name, type: str }
      - { name: extra, type: int }
"#;

    const WIRE: &str = r#"
root: Doc
messages:
  - name: Doc
    fields:
      - { name: name, number: 1, type: string }
"#;

    #[test]
    fn domain_only_field_warns_and_succeeds() {
        let domain = DomainSchemaDef::from_yaml_str(DOMAIN).unwrap();
        let wire = WireSchemaDef::from_yaml_str(WIRE).unwrap();
        let summary = validate_at_startup(&domain, &wire, &Policy::strict(), None).unwrap();
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].kind, FindingKind::MissingField);
        assert_eq!(summary.warnings[0].path.as_str(), "extra");
    }

    #[test]
    fn mismatch_blocks_startup() {
        let domain = DomainSchemaDef::from_yaml_str(&DOMAIN.replace("type: str", "type: bool")).unwrap();
        let wire = WireSchemaDef::from_yaml_str(WIRE).unwrap();
        let err = validate_at_startup(&domain, &wire, &Policy::strict(), None).unwrap_err();
        match err {
            StartupError::Incompatible(failure) => assert_eq!(failure.failures[0].path.as_str(), "name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn canonicalization_error_aborts() {
        let domain = DomainSchemaDef::from_yaml_str(&DOMAIN.replace("type: int", "type: Missing")).unwrap();
        let wire = WireSchemaDef::from_yaml_str(WIRE).unwrap();
        let err = validate_at_startup(&domain, &wire, &Policy::strict(), None).unwrap_err();
        assert!(matches!(err, StartupError::Setup(WirecheckError::Canonicalization(_))));
    }

    #[test]
    fn baseline_marks_new_paths() {
        let domain = DomainSchemaDef::from_yaml_str(DOMAIN).unwrap();
        let wire = WireSchemaDef::from_yaml_str(WIRE).unwrap();
        let policy = Policy::strict();
        let baseline = Baseline::default();
        let report = SchemaValidator::new(&policy)
            .with_baseline(Some(&baseline))
            .run(&domain, &wire)
            .unwrap();
        assert!(report.baseline_applied);
        let new: Vec<&str> = report.unclassified().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(new, vec!["extra"]);
    }
}
