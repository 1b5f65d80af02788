//! # Compatibility Rule Engine
//!
//! Decides the finding for one field present on both sides. Rules apply in
//! order and the first decisive one wins:
//!
//! 1. **Cardinality.** A list-, map- or union-shaped wire field requires the
//!    same shape on the domain side. A mismatch is FAIL and is never looked
//!    up in the allowlist.
//! 2. **Structural equivalence.** Fixed pairs against two-field messages,
//!    unions and messages covered by a oneof wrapper, dynamic maps and lists
//!    against the well-known `Struct` and `ListValue` containers. OK without
//!    consulting the allowlist.
//! 3. **Nominal.** Primitives by kind (integer widths interchangeable),
//!    enums and messages by name. Incompatible types are FAIL unless an
//!    allowlist entry covers `(path, domain, wire)`, which makes them INFO.
//! 4. **Presence.** Scalar fields whose types agree but whose presence
//!    tracking differs are WARN.

use wirecheck_core::{CanonicalType, FieldDescriptor, FieldPath, PrimitiveKind, SchemaTree};

use crate::canonicalize::{DYNAMIC_LIST, DYNAMIC_STRUCT, DYNAMIC_VALUE};
use crate::config::Policy;
use crate::finding::FindingKind;

/// How two canonical types relate, ignoring top-level presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Relation {
    /// Same type.
    Identical,
    /// Different types with the same shape on the wire.
    Structural(&'static str),
    /// Not interchangeable.
    Incompatible,
}

impl Relation {
    /// Combine the relations of two components: the worse one wins.
    pub fn and(self, other: Relation) -> Relation {
        self.max(other)
    }
}

/// The engine's decision for one field pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Classification.
    pub kind: FindingKind,
    /// Human-readable specifics.
    pub detail: String,
}

impl Verdict {
    fn new(kind: FindingKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Stateless rule evaluation against one policy and one wire tree.
pub struct CompatibilityEngine<'a> {
    policy: &'a Policy,
    wire: &'a SchemaTree,
}

impl<'a> CompatibilityEngine<'a> {
    /// An engine resolving wire messages against `wire`.
    pub fn new(policy: &'a Policy, wire: &'a SchemaTree) -> Self {
        Self { policy, wire }
    }

    /// Evaluate a field present on both sides at `path`.
    pub fn evaluate(&self, path: &FieldPath, domain: &FieldDescriptor, wire: &FieldDescriptor) -> Verdict {
        let d = &domain.canonical_type;
        let w = &wire.canonical_type;

        if let Some(verdict) = self.cardinality(d, w) {
            return verdict;
        }

        match self.relate(d, w) {
            Relation::Identical => self.presence(domain, wire),
            Relation::Structural(why) => Verdict::new(FindingKind::StructuralEquivalence, format!("{why}: {d} ~ {w}")),
            Relation::Incompatible => match self.policy.coercions.find(path, d, w) {
                Some(entry) => Verdict::new(
                    FindingKind::AllowedCoercion,
                    format!("{d} -> {w} allowed by {} ({})", entry.path, entry.rationale),
                ),
                None => Verdict::new(FindingKind::TypeMismatch, format!("domain {d} vs wire {w}")),
            },
        }
    }

    fn cardinality(&self, d: &CanonicalType, w: &CanonicalType) -> Option<Verdict> {
        let shape = d.strip_optional();
        let (expected, ok) = match w.strip_optional() {
            CanonicalType::List { .. } => ("list", matches!(shape, CanonicalType::List { .. })),
            CanonicalType::Map { .. } => ("map", matches!(shape, CanonicalType::Map { .. })),
            CanonicalType::Union { .. } => ("union", matches!(shape, CanonicalType::Union { .. })),
            _ => return None,
        };
        if ok {
            None
        } else {
            Some(Verdict::new(
                FindingKind::CardinalityMismatch,
                format!("wire is {expected}-shaped ({w}) but domain is {d}"),
            ))
        }
    }

    fn presence(&self, domain: &FieldDescriptor, wire: &FieldDescriptor) -> Verdict {
        let scalar = domain.canonical_type.is_scalar() && wire.canonical_type.is_scalar();
        if scalar && domain.is_optional != wire.is_optional {
            let describe = |optional: bool| if optional { "optional" } else { "required" };
            return Verdict::new(
                FindingKind::PresenceMismatch,
                format!(
                    "domain {} is {}, wire {} is {}",
                    domain.canonical_type,
                    describe(domain.is_optional),
                    wire.canonical_type,
                    describe(wire.is_optional)
                ),
            );
        }
        Verdict::new(FindingKind::Compatible, domain.canonical_type.to_string())
    }

    /// Relate a domain type to a wire type, seeing through `Optional` at
    /// every level.
    pub fn relate(&self, domain: &CanonicalType, wire: &CanonicalType) -> Relation {
        use CanonicalType as T;

        match (domain.strip_optional(), wire.strip_optional()) {
            (T::Primitive { kind: a }, T::Primitive { kind: b }) => same(a.compatible_with(b)),
            (T::Enum { name: a }, T::Enum { name: b }) => same(a == b),
            (T::Message { name: a }, T::Message { name: b }) if a == b => Relation::Identical,
            (T::Message { name: member }, T::Message { name: wrapper }) => {
                structural(self.policy.suppressions.wraps(wrapper, member), "member of oneof wrapper")
            }
            (T::Union { variants, .. }, T::Message { name: wrapper }) => structural(
                !variants.is_empty()
                    && variants.iter().all(|v| {
                        v.message_name()
                            .is_some_and(|member| self.policy.suppressions.wraps(wrapper, member))
                    }),
                "union covered by oneof wrapper",
            ),
            (T::Pair { first, second }, T::Message { name }) => {
                structural(self.is_pair_message(name, *first, *second), "fixed pair as two-field message")
            }
            (T::Map { key, value }, T::Message { name }) if name == DYNAMIC_STRUCT => structural(
                key.strip_optional() == &T::string() && value.message_name() == Some(DYNAMIC_VALUE),
                "dynamic map as Struct",
            ),
            (T::List { element }, T::Message { name }) if name == DYNAMIC_LIST => {
                structural(element.message_name() == Some(DYNAMIC_VALUE), "dynamic list as ListValue")
            }
            (T::List { element: a }, T::List { element: b }) => self.relate(a, b),
            (T::Map { key: dk, value: dv }, T::Map { key: wk, value: wv }) => {
                self.relate(dk, wk).and(self.relate(dv, wv))
            }
            (T::Union { variants: dv, .. }, T::Union { variants: wv, .. }) => self.relate_unions(dv, wv),
            _ => Relation::Incompatible,
        }
    }

    /// Every variant on each side must relate to some variant on the other.
    fn relate_unions(&self, domain: &[CanonicalType], wire: &[CanonicalType]) -> Relation {
        let covers = |ws: &[CanonicalType], ds: &[CanonicalType], wire_side: bool| {
            ws.iter()
                .map(|w| {
                    ds.iter()
                        .map(|d| if wire_side { self.relate(d, w) } else { self.relate(w, d) })
                        .min()
                        .unwrap_or(Relation::Incompatible)
                })
                .max()
                .unwrap_or(Relation::Incompatible)
        };
        covers(wire, domain, true).and(covers(domain, wire, false))
    }

    fn is_pair_message(&self, name: &str, first: PrimitiveKind, second: PrimitiveKind) -> bool {
        let Some(node) = self.wire.node(name) else {
            return false;
        };
        let kind_of = |i: usize| match node.fields.get(i).map(|f| f.canonical_type.strip_optional()) {
            Some(CanonicalType::Primitive { kind }) => Some(*kind),
            _ => None,
        };
        node.fields.len() == 2
            && kind_of(0).is_some_and(|k| k.compatible_with(&first))
            && kind_of(1).is_some_and(|k| k.compatible_with(&second))
    }
}

fn same(equal: bool) -> Relation {
    if equal {
        Relation::Identical
    } else {
        Relation::Incompatible
    }
}

fn structural(holds: bool, why: &'static str) -> Relation {
    if holds {
        Relation::Structural(why)
    } else {
        Relation::Incompatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::{CoercionList, CoercionSpec};
    use crate::config::RegistryConfig;
    use crate::finding::Severity;
    use wirecheck_core::{SchemaNode, Side};

    fn wire_tree() -> SchemaTree {
        let mut tree = SchemaTree::new(Side::Wire, "Doc");
        let mut span = SchemaNode::new("IntSpan");
        for name in ["start", "end"] {
            span.fields.push(FieldDescriptor::new(
                Side::Wire,
                FieldPath::parse(name),
                name,
                CanonicalType::primitive(PrimitiveKind::Int32),
            ));
        }
        tree.insert(span);
        tree
    }

    fn policy() -> Policy {
        let mut policy = RegistryConfig::builtin().unwrap().compile().unwrap();
        policy.coercions = CoercionList::from_specs(vec![CoercionSpec {
            path: "**.label".into(),
            domain: "enum".into(),
            wire: "string".into(),
            rationale: "open labels".into(),
        }])
        .unwrap();
        policy
    }

    fn field(side: Side, ty: CanonicalType) -> FieldDescriptor {
        FieldDescriptor::new(side, FieldPath::parse("f"), "f", ty)
    }

    fn eval(path: &str, d: CanonicalType, w: CanonicalType) -> Verdict {
        let policy = policy();
        let tree = wire_tree();
        let engine = CompatibilityEngine::new(&policy, &tree);
        engine.evaluate(&FieldPath::parse(path), &field(Side::Domain, d), &field(Side::Wire, w))
    }

    fn int() -> CanonicalType {
        CanonicalType::primitive(PrimitiveKind::Int64)
    }

    #[test]
    fn pair_matches_two_int_message() {
        let v = eval(
            "texts.prov.charspan",
            CanonicalType::pair(PrimitiveKind::Int64, PrimitiveKind::Int64),
            CanonicalType::message("IntSpan"),
        );
        assert_eq!(v.kind, FindingKind::StructuralEquivalence);
        let v = eval(
            "texts.prov.charspan",
            CanonicalType::pair(PrimitiveKind::Float, PrimitiveKind::Float),
            CanonicalType::message("IntSpan"),
        );
        assert_eq!(v.kind, FindingKind::TypeMismatch);
    }

    #[test]
    fn enum_to_string_is_allowlisted_by_path() {
        let label = CanonicalType::enumeration("DocItemLabel");
        let v = eval("items.3.label", label.clone(), CanonicalType::string());
        assert_eq!(v.kind, FindingKind::AllowedCoercion);
        assert_eq!(v.kind.severity(), Severity::Info);
        let v = eval("items.3.custom_code", label, CanonicalType::string());
        assert_eq!(v.kind, FindingKind::TypeMismatch);
    }

    #[test]
    fn cardinality_is_never_allowlisted() {
        let v = eval("items", CanonicalType::message("Foo"), CanonicalType::list(CanonicalType::message("Foo")));
        assert_eq!(v.kind, FindingKind::CardinalityMismatch);
        let v = eval("label", CanonicalType::enumeration("L"), CanonicalType::list(CanonicalType::string()));
        assert_eq!(v.kind, FindingKind::CardinalityMismatch);
    }

    #[test]
    fn integer_widths_are_interchangeable() {
        let v = eval("n", int(), CanonicalType::primitive(PrimitiveKind::Int32));
        assert_eq!(v.kind, FindingKind::Compatible);
    }

    #[test]
    fn wrappers_and_dynamic_containers_are_structural() {
        let v = eval("texts", CanonicalType::message("TitleItem"), CanonicalType::message("BaseTextItem"));
        assert_eq!(v.kind, FindingKind::StructuralEquivalence);
        let union = CanonicalType::union(
            [CanonicalType::message("TitleItem"), CanonicalType::message("TextItem")],
            None,
        );
        let v = eval("texts", union, CanonicalType::message("BaseTextItem"));
        assert_eq!(v.kind, FindingKind::StructuralEquivalence);
        let dynamic = CanonicalType::map(CanonicalType::string(), CanonicalType::message(DYNAMIC_VALUE));
        let v = eval("meta", dynamic, CanonicalType::message(DYNAMIC_STRUCT));
        assert_eq!(v.kind, FindingKind::StructuralEquivalence);
    }

    #[test]
    fn unions_must_cover_each_other() {
        let a = CanonicalType::message("A");
        let b = CanonicalType::message("B");
        let c = CanonicalType::message("C");
        let v = eval(
            "u",
            CanonicalType::union([a.clone(), b.clone()], None),
            CanonicalType::union([b.clone(), a.clone()], Some("kind".into())),
        );
        assert_eq!(v.kind, FindingKind::Compatible);
        let v = eval(
            "u",
            CanonicalType::union([a.clone(), b.clone()], None),
            CanonicalType::union([a, c], Some("kind".into())),
        );
        assert_eq!(v.kind, FindingKind::TypeMismatch);
    }

    #[test]
    fn presence_divergence_warns_for_scalars_only() {
        let policy = policy();
        let tree = wire_tree();
        let engine = CompatibilityEngine::new(&policy, &tree);
        let path = FieldPath::parse("name");
        let d = field(Side::Domain, CanonicalType::string());
        let w = field(Side::Wire, CanonicalType::optional(CanonicalType::string()));
        assert_eq!(engine.evaluate(&path, &d, &w).kind, FindingKind::PresenceMismatch);

        let d = field(Side::Domain, CanonicalType::message("Item"));
        let w = field(Side::Wire, CanonicalType::message("Item")).with_optional(true);
        assert_eq!(engine.evaluate(&path, &d, &w).kind, FindingKind::Compatible);
    }

    #[test]
    fn relation_combines_to_the_worst() {
        assert_eq!(Relation::Identical.and(Relation::Structural("x")), Relation::Structural("x"));
        assert_eq!(Relation::Structural("x").and(Relation::Incompatible), Relation::Incompatible);
    }
}
