//! # Domain Schema Source and Extractor
//!
//! The domain schema is the in-process source of truth: a set of models whose
//! fields carry annotation-style type expressions, plus the enums and
//! nominal newtypes those expressions refer to. [`DomainSchemaDef`] is its
//! serde form (YAML or JSON); [`DomainSource`] is the read-only view the
//! extractor needs, so callers can feed the extractor from any model registry.
//!
//! ## Extraction
//!
//! [`extract_domain`] walks depth-first from the root model. Each model
//! becomes one [`SchemaNode`]; each declared field (inherited fields first)
//! becomes one [`FieldDescriptor`] whose path is where the walk first reached
//! it. Models are expanded once; later references resolve by name.
//!
//! Extension accessors (dynamically attached data such as custom fields) are
//! never fields. They are logged at debug level and skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use wirecheck_core::{
    CanonicalizationError, FieldDescriptor, FieldPath, SchemaNode, SchemaTree, Side, WirecheckError,
};

use crate::canonicalize::{nested_messages, with_discriminator, DomainCanonicalizer};

// ---------------------------------------------------------------------------
// Definition format
// ---------------------------------------------------------------------------

/// Serialized domain schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainSchemaDef {
    /// Name of the top-level model.
    pub root: String,
    /// Nominal wrapper types: name → underlying type expression.
    #[serde(default)]
    pub newtypes: BTreeMap<String, String>,
    /// Enumerations: name → values.
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
    /// Models by name.
    pub models: BTreeMap<String, ModelDef>,
}

/// One domain model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDef {
    /// Parent models whose fields are inherited, in resolution order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// Declared fields in order.
    #[serde(default)]
    pub fields: Vec<DomainFieldDef>,
    /// Dynamically attached accessors. Never emitted as fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

/// One declared domain field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainFieldDef {
    /// Field name.
    pub name: String,
    /// Type expression, e.g. `list[union[TitleItem, TextItem]]`.
    #[serde(rename = "type")]
    pub type_expr: String,
    /// Explicit required marker. When absent the field is required unless
    /// its type is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Discriminator of a tagged union type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
}

impl DomainSchemaDef {
    /// Parse a definition from YAML (JSON is accepted as a YAML subset).
    pub fn from_yaml_str(input: &str) -> Result<Self, WirecheckError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Read and parse a definition file.
    pub fn from_path(path: &Path) -> Result<Self, WirecheckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn collect_fields<'a>(
        &'a self,
        model: &str,
        context: &str,
        seen: &mut BTreeSet<String>,
        out: &mut Vec<&'a DomainFieldDef>,
    ) -> Result<(), CanonicalizationError> {
        let def = self
            .models
            .get(model)
            .ok_or_else(|| CanonicalizationError::UnknownReference {
                side: Side::Domain,
                name: model.to_string(),
                context: context.to_string(),
            })?;
        if !seen.insert(model.to_string()) {
            return Ok(());
        }
        for base in &def.bases {
            self.collect_fields(base, &format!("{model} bases"), seen, out)?;
        }
        for field in &def.fields {
            match out.iter_mut().find(|existing| existing.name == field.name) {
                Some(slot) => *slot = field,
                None => out.push(field),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// What a bare type name refers to on the domain side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedType<'a> {
    /// A model.
    Model,
    /// An enumeration with its values.
    Enum(&'a [String]),
    /// A nominal wrapper around another type expression.
    NewType(&'a str),
}

/// Read-only view of a domain schema.
pub trait DomainSource {
    /// Name of the top-level model.
    fn root_model(&self) -> &str;

    /// Declared fields of `model` in order, inherited fields first. A field
    /// redeclared by a subclass replaces the inherited one in place.
    fn declared_fields(&self, model: &str) -> Result<Vec<&DomainFieldDef>, CanonicalizationError>;

    /// Names of dynamically attached accessors on `model`.
    fn extensions(&self, model: &str) -> Vec<&str>;

    /// Resolve a bare type name.
    fn lookup(&self, name: &str) -> Option<NamedType<'_>>;
}

impl DomainSource for DomainSchemaDef {
    fn root_model(&self) -> &str {
        &self.root
    }

    fn declared_fields(&self, model: &str) -> Result<Vec<&DomainFieldDef>, CanonicalizationError> {
        let mut out = Vec::new();
        self.collect_fields(model, model, &mut BTreeSet::new(), &mut out)?;
        Ok(out)
    }

    fn extensions(&self, model: &str) -> Vec<&str> {
        self.models
            .get(model)
            .map(|m| m.extensions.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn lookup(&self, name: &str) -> Option<NamedType<'_>> {
        if self.models.contains_key(name) {
            Some(NamedType::Model)
        } else if let Some(values) = self.enums.get(name) {
            Some(NamedType::Enum(values))
        } else {
            self.newtypes.get(name).map(|expr| NamedType::NewType(expr))
        }
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extract the domain [`SchemaTree`] reachable from the source's root model.
pub fn extract_domain<S: DomainSource + ?Sized>(source: &S) -> Result<SchemaTree, CanonicalizationError> {
    let root = source.root_model();
    let mut walk = DomainWalk {
        source,
        canonicalizer: DomainCanonicalizer::new(source),
        tree: SchemaTree::new(Side::Domain, root),
    };
    walk.visit(root, &FieldPath::root())?;
    tracing::debug!(
        root,
        models = walk.tree.nodes.len(),
        fields = walk.tree.field_count(),
        "extracted domain schema"
    );
    Ok(walk.tree)
}

struct DomainWalk<'a, S: ?Sized> {
    source: &'a S,
    canonicalizer: DomainCanonicalizer<'a, S>,
    tree: SchemaTree,
}

impl<'a, S: DomainSource + ?Sized> DomainWalk<'a, S> {
    fn visit(&mut self, model: &str, path: &FieldPath) -> Result<(), CanonicalizationError> {
        if self.tree.contains(model) {
            return Ok(());
        }
        // Placeholder so self-references resolve while the node is built.
        self.tree.insert(SchemaNode::new(model));

        let source = self.source;
        for extension in source.extensions(model) {
            tracing::debug!(model, extension, "skipping dynamic extension accessor");
        }

        let mut node = SchemaNode::new(model);
        let mut nested = Vec::new();
        for def in source.declared_fields(model)? {
            let context = format!("{model}.{}", def.name);
            let mut ty = self.canonicalizer.canonicalize_str(&def.type_expr, &context)?;
            if let Some(discriminator) = &def.discriminator {
                ty = with_discriminator(ty, discriminator);
            }
            let field_path = path.child(&def.name);
            let optional = ty.is_optional() || def.required == Some(false);
            nested_messages(&ty, &field_path, &mut nested);
            node.fields
                .push(FieldDescriptor::new(Side::Domain, field_path, &def.name, ty).with_optional(optional));
        }
        self.tree.insert(node);

        for (nested_path, name) in nested {
            // Dynamic values (`Any`) canonicalize to a message no model declares.
            if matches!(source.lookup(&name), Some(NamedType::Model)) {
                self.visit(&name, &nested_path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirecheck_core::CanonicalType;

    const DOC: &str = r#"
root: Doc
newtypes:
  RefId: str
enums:
  Label: [title, text]
models:
  Doc:
    fields:
      - { name: name, type: str }
      - { name: version, type: str, required: false }
      - { name: items, type: "list[union[Title, Text]]" }
      - { name: parent, type: "optional[Ref]" }
      - { name: meta, type: "dict[str, Any]" }
    extensions: [custom_fields]
  Base:
    fields:
      - { name: text, type: str }
      - { name: label, type: Label }
  Title:
    bases: [Base]
    fields:
      - { name: level, type: int }
  Text:
    bases: [Base]
    fields:
      - { name: label, type: "literal['text']" }
  Ref:
    fields:
      - { name: cref, type: RefId }
      - { name: children, type: "list[Ref]" }
"#;

    fn doc() -> DomainSchemaDef {
        DomainSchemaDef::from_yaml_str(DOC).unwrap()
    }

    #[test]
    fn extracts_reachable_models_only() {
        let tree = extract_domain(&doc()).unwrap();
        assert_eq!(tree.root, "Doc");
        let names: Vec<&str> = tree.nodes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Doc", "Ref", "Text", "Title"]);
    }

    #[test]
    fn inherited_fields_come_first_and_can_be_overridden() {
        let tree = extract_domain(&doc()).unwrap();
        let title = tree.node("Title").unwrap();
        let names: Vec<&str> = title.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["text", "label", "level"]);
        assert_eq!(title.field("label").unwrap().canonical_type, CanonicalType::enumeration("Label"));

        let text = tree.node("Text").unwrap();
        assert_eq!(text.field("label").unwrap().canonical_type, CanonicalType::string());
    }

    #[test]
    fn paths_follow_first_discovery() {
        let tree = extract_domain(&doc()).unwrap();
        let title = tree.node("Title").unwrap();
        assert_eq!(title.field("level").unwrap().path.as_str(), "items.Title.level");
        let reference = tree.node("Ref").unwrap();
        assert_eq!(reference.field("cref").unwrap().path.as_str(), "parent.cref");
        assert_eq!(reference.field("cref").unwrap().canonical_type, CanonicalType::string());
    }

    #[test]
    fn required_marker_sets_optional_flag() {
        let tree = extract_domain(&doc()).unwrap();
        let root = tree.root_node().unwrap();
        let version = root.field("version").unwrap();
        assert!(version.is_optional);
        assert!(!version.canonical_type.is_optional());
        assert!(!root.field("name").unwrap().is_optional);
        assert!(root.field("parent").unwrap().is_optional);
    }

    #[test]
    fn extensions_are_not_fields() {
        let tree = extract_domain(&doc()).unwrap();
        assert!(tree.root_node().unwrap().field("custom_fields").is_none());
    }

    #[test]
    fn unknown_base_is_reported() {
        let mut def = doc();
        def.models.get_mut("Title").unwrap().bases.push("Missing".to_string());
        let err = extract_domain(&def).unwrap_err();
        assert!(matches!(err, CanonicalizationError::UnknownReference { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn unknown_field_type_is_reported() {
        let mut def = doc();
        def.models.get_mut("Doc").unwrap().fields.push(DomainFieldDef {
            name: "extra".to_string(),
            type_expr: "Nowhere".to_string(),
            required: None,
            discriminator: None,
        });
        let err = extract_domain(&def).unwrap_err();
        assert!(err.to_string().contains("Nowhere"));
        assert!(err.to_string().contains("Doc.extra"));
    }
}
