//! # Comparator
//!
//! Depth-first paired traversal of the domain and wire schema trees.
//!
//! ## Design
//!
//! The walk starts at both roots with an empty path and grows the path by
//! one segment per field. Map fields add no key/value segment; union
//! variants add the variant's message name. At each node the comparator:
//!
//! 1. flattens base-field wrappers on the wire side,
//! 2. pairs fields by name, resolving field aliases,
//! 3. drops paths covered by a subtree suppression rule,
//! 4. emits a missing-field finding for one-sided fields and asks the
//!    [`CompatibilityEngine`] about two-sided ones,
//! 5. descends into nested messages unless the wire message is a leaf or a
//!    oneof wrapper. Oneof-wrapper members are queued and validated after the
//!    main walk, each once, under a path prefix equal to the member name.
//!
//! ## Invariants
//!
//! - A message name is entered at most once along any path, per side.
//!   Re-entry emits nothing for that subtree.
//! - Nested message depth is bounded by the policy. Exceeding it truncates
//!   silently and is counted, never reported as a finding.
//! - At most one finding per path per run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use wirecheck_core::{CanonicalType, FieldDescriptor, FieldPath, SchemaNode, SchemaTree, Side};

use crate::compat::CompatibilityEngine;
use crate::config::Policy;
use crate::finding::{Finding, FindingKind};

/// Counters describing one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    /// Message pairs entered.
    pub nodes_visited: usize,
    /// Descents skipped because a message was already on the path.
    pub reentries: usize,
    /// Descents skipped because of the depth bound.
    pub truncated: usize,
    /// Paths dropped by subtree suppression rules.
    pub suppressed: usize,
    /// Descents stopped at leaf messages.
    pub leaves: usize,
    /// Oneof-wrapper members validated after the main walk.
    pub wrapper_members: usize,
}

/// Output of one comparator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Findings in traversal order.
    pub findings: Vec<Finding>,
    /// Traversal counters.
    pub stats: TraversalStats,
}

/// One paired traversal over two schema trees.
pub struct Comparator<'a> {
    domain: &'a SchemaTree,
    wire: &'a SchemaTree,
    policy: &'a Policy,
    engine: CompatibilityEngine<'a>,
    findings: Vec<Finding>,
    emitted: BTreeSet<FieldPath>,
    domain_stack: BTreeSet<String>,
    wire_stack: BTreeSet<String>,
    pending_members: BTreeSet<String>,
    validated_members: BTreeSet<String>,
    stats: TraversalStats,
}

impl<'a> Comparator<'a> {
    /// A comparator over `domain` and `wire` under `policy`.
    pub fn new(domain: &'a SchemaTree, wire: &'a SchemaTree, policy: &'a Policy) -> Self {
        Self {
            domain,
            wire,
            policy,
            engine: CompatibilityEngine::new(policy, wire),
            findings: Vec::new(),
            emitted: BTreeSet::new(),
            domain_stack: BTreeSet::new(),
            wire_stack: BTreeSet::new(),
            pending_members: BTreeSet::new(),
            validated_members: BTreeSet::new(),
            stats: TraversalStats::default(),
        }
    }

    /// Walk both trees and return every finding.
    pub fn run(mut self) -> Comparison {
        let (domain, wire) = (self.domain, self.wire);
        self.walk(&FieldPath::root(), &domain.root, &wire.root, 0);

        while let Some(member) = self.pending_members.pop_first() {
            self.validated_members.insert(member.clone());
            if !(domain.contains(&member) && wire.contains(&member)) {
                tracing::debug!(member = %member, "oneof wrapper member not declared on both sides");
                continue;
            }
            self.stats.wrapper_members += 1;
            self.walk(&FieldPath::root().child(&member), &member, &member, 0);
        }

        Comparison {
            findings: self.findings,
            stats: self.stats,
        }
    }

    fn walk(&mut self, prefix: &FieldPath, domain_name: &str, wire_name: &str, depth: usize) {
        if depth > self.policy.max_depth {
            self.stats.truncated += 1;
            tracing::debug!(path = %prefix, depth, "depth bound reached, truncating");
            return;
        }
        let (domain, wire) = (self.domain, self.wire);
        let (Some(domain_node), Some(wire_node)) = (domain.node(domain_name), wire.node(wire_name)) else {
            tracing::debug!(path = %prefix, domain_name, wire_name, "message not extracted on both sides");
            return;
        };
        if self.domain_stack.contains(domain_name) || self.wire_stack.contains(wire_name) {
            self.stats.reentries += 1;
            return;
        }
        self.domain_stack.insert(domain_name.to_string());
        self.wire_stack.insert(wire_name.to_string());
        self.stats.nodes_visited += 1;

        let mut guard = BTreeSet::new();
        let wire_fields = self.flatten_wire_fields(wire_node, &mut guard);
        for (segment, d, w) in self.pair_fields(domain_node, wire_fields) {
            let path = prefix.child(&segment);
            if let Some(rule) = self.policy.suppressions.subtree_rule(&path) {
                self.stats.suppressed += 1;
                tracing::debug!(path = %path, rule = %rule, "suppressed");
                continue;
            }
            match (d, w) {
                (Some(d), None) => self.emit(Finding::missing(path, Side::Domain, &d.canonical_type)),
                (None, Some(w)) => self.emit(Finding::missing(path, Side::Wire, &w.canonical_type)),
                (Some(d), Some(w)) => {
                    let verdict = self.engine.evaluate(&path, d, w);
                    let descend = !matches!(
                        verdict.kind,
                        FindingKind::CardinalityMismatch | FindingKind::TypeMismatch
                    );
                    self.emit(
                        Finding::new(path.clone(), verdict.kind, verdict.detail)
                            .with_domain_type(&d.canonical_type)
                            .with_wire_type(&w.canonical_type),
                    );
                    if descend {
                        self.descend(&path, &d.canonical_type, &w.canonical_type, depth);
                    }
                }
                (None, None) => {}
            }
        }

        self.domain_stack.remove(domain_name);
        self.wire_stack.remove(wire_name);
    }

    /// Follow nested messages through collections, optionals and unions.
    fn descend(&mut self, path: &FieldPath, domain: &CanonicalType, wire: &CanonicalType, depth: usize) {
        use CanonicalType as T;

        match (domain.strip_optional(), wire.strip_optional()) {
            (T::List { element: d }, T::List { element: w }) => self.descend(path, d, w, depth),
            (T::Map { value: d, .. }, T::Map { value: w, .. }) => self.descend(path, d, w, depth),
            (T::Message { name: d }, T::Message { name: w }) => self.enter(path, d, w, depth),
            (T::Union { .. }, T::Message { name: w }) => self.enter(path, w, w, depth),
            (T::Union { variants: dv, .. }, T::Union { variants: wv, .. }) => {
                for variant in wv {
                    let Some(name) = variant.message_name() else { continue };
                    if dv.iter().any(|d| d.message_name() == Some(name)) {
                        self.enter(&path.child(name), name, name, depth);
                    }
                }
            }
            _ => {}
        }
    }

    /// Enter a message pair, applying the wire-message rules first.
    fn enter(&mut self, path: &FieldPath, domain_name: &str, wire_name: &str, depth: usize) {
        let suppressions = &self.policy.suppressions;
        if suppressions.is_leaf_message(wire_name) {
            self.stats.leaves += 1;
            return;
        }
        if let Some(members) = suppressions.oneof_wrapper_members(wire_name) {
            for member in members {
                if !self.validated_members.contains(member) {
                    self.pending_members.insert(member.clone());
                }
            }
            return;
        }
        if domain_name != wire_name {
            return;
        }
        self.walk(path, domain_name, wire_name, depth + 1);
    }

    /// Wire fields of `node`, with base-field wrappers replaced by the
    /// fields of the wrapped message.
    fn flatten_wire_fields(&self, node: &'a SchemaNode, guard: &mut BTreeSet<&'a str>) -> Vec<&'a FieldDescriptor> {
        let wire = self.wire;
        let Some(base) = self.policy.suppressions.base_wrapper_field(&node.name) else {
            return node.fields.iter().collect();
        };
        let mut out = Vec::with_capacity(node.fields.len());
        for field in &node.fields {
            let wrapped = (field.name == base)
                .then(|| field.canonical_type.message_name())
                .flatten()
                .and_then(|name| wire.node(name));
            match wrapped {
                Some(inner) if guard.insert(inner.name.as_str()) => out.extend(self.flatten_wire_fields(inner, guard)),
                _ => out.push(field),
            }
        }
        out
    }

    /// Pair domain and wire fields by name, sorted by path segment.
    #[allow(clippy::type_complexity)]
    fn pair_fields(
        &self,
        domain_node: &'a SchemaNode,
        wire_fields: Vec<&'a FieldDescriptor>,
    ) -> Vec<(String, Option<&'a FieldDescriptor>, Option<&'a FieldDescriptor>)> {
        let mut by_name: BTreeMap<&str, &'a FieldDescriptor> = BTreeMap::new();
        for field in wire_fields {
            by_name.entry(field.name.as_str()).or_insert(field);
        }

        let mut pairs = Vec::new();
        for d in &domain_node.fields {
            let w = by_name.remove(d.name.as_str()).or_else(|| {
                self.policy
                    .suppressions
                    .wire_alias(&d.name)
                    .and_then(|alias| by_name.remove(alias))
            });
            pairs.push((d.name.clone(), Some(d), w));
        }
        for (name, w) in by_name {
            pairs.push((name.to_string(), None, Some(w)));
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    fn emit(&mut self, finding: Finding) {
        if self.emitted.insert(finding.path.clone()) {
            self.findings.push(finding);
        } else {
            tracing::debug!(path = %finding.path, "path already reported");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::domain::{extract_domain, DomainSchemaDef};
    use crate::finding::Severity;
    use crate::wire::{extract_wire, WireSchemaDef};

    fn compare(domain: &str, wire: &str, registry: &str) -> Comparison {
        let d = extract_domain(&DomainSchemaDef::from_yaml_str(domain).unwrap()).unwrap();
        let w = extract_wire(&WireSchemaDef::from_yaml_str(wire).unwrap()).unwrap();
        let policy = RegistryConfig::from_yaml_str(registry).unwrap().compile().unwrap();
        Comparator::new(&d, &w, &policy).run()
    }

    fn kinds(c: &Comparison) -> Vec<(String, FindingKind)> {
        c.findings.iter().map(|f| (f.path.to_string(), f.kind)).collect()
    }

    const TREE_DOMAIN: &str = r#"
root: Node
models:
  Node:
    fields:
      - { name: name, type: str }
      - { name: children, type: "list[Node]" }
      - { name: parent, type: "optional[Node]" }
"#;

    const TREE_WIRE: &str = r#"
root: Node
messages:
  - name: Node
    fields:
      - { name: name, number: 1, type: string }
      - { name: children, number: 2, type: message, type_name: Node, label: repeated }
      - { name: parent, number: 3, type: message, type_name: Node }
"#;

    #[test]
    fn self_recursion_terminates_with_single_visit() {
        let c = compare(TREE_DOMAIN, TREE_WIRE, "{}");
        assert_eq!(
            kinds(&c),
            vec![
                ("children".to_string(), FindingKind::Compatible),
                ("name".to_string(), FindingKind::Compatible),
                ("parent".to_string(), FindingKind::Compatible),
            ]
        );
        assert_eq!(c.stats.nodes_visited, 1);
        assert_eq!(c.stats.reentries, 2);
    }

    #[test]
    fn identical_schemas_have_no_warn_or_fail() {
        let c = compare(TREE_DOMAIN, TREE_WIRE, "{}");
        assert!(c.findings.iter().all(|f| f.severity == Severity::Ok));
    }

    const NESTED_DOMAIN: &str = r#"
root: Doc
models:
  Doc:
    fields:
      - { name: body, type: Group }
      - { name: pages, type: "dict[int, Page]" }
      - { name: extra, type: str }
  Group:
    fields:
      - { name: cref, type: str }
      - { name: inner, type: Group2 }
  Group2:
    fields:
      - { name: depth, type: int }
  Page:
    fields:
      - { name: page_no, type: int }
"#;

    const NESTED_WIRE: &str = r#"
root: Doc
messages:
  - name: Doc
    fields:
      - { name: body, number: 1, type: message, type_name: Group }
      - { name: pages, number: 2, type: message, type_name: PagesEntry, label: repeated }
      - { name: grid, number: 3, type: message, type_name: Grid, label: repeated }
  - name: PagesEntry
    map_entry: true
    fields:
      - { name: key, number: 1, type: int32 }
      - { name: value, number: 2, type: message, type_name: Page }
  - name: Page
    fields:
      - { name: page_no, number: 1, type: int32 }
  - name: Group
    fields:
      - { name: ref, number: 1, type: string }
      - { name: inner, number: 2, type: message, type_name: Group2 }
  - name: Group2
    fields:
      - { name: depth, number: 1, type: int64 }
  - name: Grid
    fields:
      - { name: cells, number: 1, type: string, label: repeated }
"#;

    #[test]
    fn map_values_add_no_segment_and_aliases_pair() {
        let registry = r#"
suppressions:
  - { kind: field_alias, domain: cref, wire: ref, rationale: "alias" }
"#;
        let c = compare(NESTED_DOMAIN, NESTED_WIRE, registry);
        let paths: Vec<String> = c.findings.iter().map(|f| f.path.to_string()).collect();
        assert!(paths.contains(&"pages.page_no".to_string()));
        assert!(paths.contains(&"body.cref".to_string()));
        assert!(!paths.iter().any(|p| p.ends_with(".ref")));
        assert!(!c.findings.iter().any(|f| f.kind == FindingKind::MissingField && f.path.as_str() == "body.cref"));
    }

    #[test]
    fn one_sided_fields_warn() {
        let c = compare(NESTED_DOMAIN, NESTED_WIRE, "{}");
        let missing: Vec<String> = c
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::MissingField)
            .map(|f| f.path.to_string())
            .collect();
        assert_eq!(missing, vec!["body.cref", "body.ref", "extra", "grid"]);
    }

    #[test]
    fn proto_only_prefix_produces_nothing() {
        let registry = r#"
suppressions:
  - { kind: proto_only_prefix, prefix: grid, rationale: "derived" }
"#;
        let c = compare(NESTED_DOMAIN, NESTED_WIRE, registry);
        assert!(!c.findings.iter().any(|f| f.path.matches_prefix("grid")));
        assert_eq!(c.stats.suppressed, 1);
    }

    #[test]
    fn depth_bound_truncates_silently() {
        let c = compare(NESTED_DOMAIN, NESTED_WIRE, "max_depth: 1\n");
        assert!(c.findings.iter().any(|f| f.path.as_str() == "body.inner"));
        assert!(!c.findings.iter().any(|f| f.path.as_str() == "body.inner.depth"));
        assert_eq!(c.stats.truncated, 1);
        assert!(c.findings.iter().all(|f| f.severity != Severity::Fail));
    }

    const WRAPPED_DOMAIN: &str = r#"
root: Doc
models:
  Doc:
    fields:
      - { name: texts, type: "list[union[TitleItem, TextItem]]" }
      - { name: span, type: "tuple[int, int]" }
  TextItem:
    fields:
      - { name: text, type: str }
  TitleItem:
    bases: [TextItem]
    fields:
      - { name: level, type: int }
"#;

    const WRAPPED_WIRE: &str = r#"
root: Doc
messages:
  - name: Doc
    fields:
      - { name: texts, number: 1, type: message, type_name: BaseTextItem, label: repeated }
      - { name: span, number: 2, type: message, type_name: IntSpan }
  - name: IntSpan
    fields:
      - { name: start, number: 1, type: int64 }
      - { name: end, number: 2, type: int64 }
  - name: BaseTextItem
    oneofs: [ { name: item } ]
    fields:
      - { name: title, number: 1, type: message, type_name: TitleItem, oneof: item }
      - { name: text, number: 2, type: message, type_name: TextItem, oneof: item }
  - name: TextBase
    fields:
      - { name: text, number: 1, type: string }
  - name: TitleItem
    fields:
      - { name: base, number: 1, type: message, type_name: TextBase }
      - { name: level, number: 2, type: int32 }
  - name: TextItem
    fields:
      - { name: base, number: 1, type: message, type_name: TextBase }
"#;

    const WRAPPED_REGISTRY: &str = r#"
suppressions:
  - { kind: oneof_wrapper, message: BaseTextItem, members: [TitleItem, TextItem], rationale: "oneof" }
  - { kind: base_field_wrapper, message: TitleItem, field: base, rationale: "inheritance" }
  - { kind: base_field_wrapper, message: TextItem, field: base, rationale: "inheritance" }
  - { kind: leaf_message, message: IntSpan, rationale: "pair" }
"#;

    #[test]
    fn wrappers_flatten_and_members_validate_once() {
        let c = compare(WRAPPED_DOMAIN, WRAPPED_WIRE, WRAPPED_REGISTRY);
        assert_eq!(
            kinds(&c),
            vec![
                ("span".to_string(), FindingKind::StructuralEquivalence),
                ("texts".to_string(), FindingKind::StructuralEquivalence),
                ("TextItem.text".to_string(), FindingKind::Compatible),
                ("TitleItem.level".to_string(), FindingKind::Compatible),
                ("TitleItem.text".to_string(), FindingKind::Compatible),
            ]
        );
        assert_eq!(c.stats.wrapper_members, 2);
    }

    #[test]
    fn without_rules_wrapper_divergence_fails() {
        let c = compare(WRAPPED_DOMAIN, WRAPPED_WIRE, "{}");
        let texts = c.findings.iter().find(|f| f.path.as_str() == "texts").unwrap();
        assert_eq!(texts.kind, FindingKind::TypeMismatch);
    }

    #[test]
    fn runs_are_deterministic() {
        let a = compare(WRAPPED_DOMAIN, WRAPPED_WIRE, WRAPPED_REGISTRY);
        let b = compare(WRAPPED_DOMAIN, WRAPPED_WIRE, WRAPPED_REGISTRY);
        assert_eq!(a, b);
    }
}
