//! # Wire Schema Source and Extractor
//!
//! The wire schema is the cross-process transport schema, described by the
//! same reflective metadata a protobuf descriptor pool exposes: messages with
//! numbered, labelled fields, oneof groups, presence flags, map-entry
//! markers, and enums. [`WireSchemaDef`] is its serde form; [`WireReflection`]
//! is the lookup interface the extractor needs.
//!
//! ## Extraction
//!
//! [`extract_wire`] mirrors [`crate::domain::extract_domain`]:
//!
//! - Map-entry messages never become nodes; the referencing field is a `Map`
//!   and the walk continues into the value message.
//! - A non-synthetic oneof with more than one member collapses into one
//!   descriptor named after the group, typed as a `Union` over the members
//!   with the group name as discriminator.
//! - Synthetic oneofs (proto3 `optional`) are presence markers only.
//! - Message fields always track presence; repeated and map fields never do.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use wirecheck_core::{
    CanonicalType, CanonicalizationError, FieldDescriptor, FieldPath, SchemaNode, SchemaTree, Side,
    WirecheckError,
};

use crate::canonicalize::{canonicalize_wire_field, nested_messages, wire_base_type};

// ---------------------------------------------------------------------------
// Definition format
// ---------------------------------------------------------------------------

/// Serialized wire schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireSchemaDef {
    /// Name of the top-level message.
    pub root: String,
    /// Package the messages belong to. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Enum definitions.
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    /// Message definitions.
    pub messages: Vec<MessageDef>,
}

/// One wire enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDef {
    /// Unqualified enum name.
    pub name: String,
    /// Value names in number order.
    #[serde(default)]
    pub values: Vec<String>,
}

/// One wire message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDef {
    /// Unqualified message name.
    pub name: String,
    /// Whether this is the synthesized entry type of a map field.
    #[serde(default)]
    pub map_entry: bool,
    /// Declared oneof groups, including synthetic presence oneofs.
    #[serde(default)]
    pub oneofs: Vec<OneofDef>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<WireFieldDef>,
}

/// One oneof group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OneofDef {
    /// Group name.
    pub name: String,
    /// Whether the group only carries presence for a proto3 `optional` field.
    #[serde(default)]
    pub synthetic: bool,
}

impl OneofDef {
    /// Synthetic groups are flagged explicitly or named with a leading `_`.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic || self.name.starts_with('_')
    }
}

/// Scalar or reference kind of a wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Enum,
    Message,
    Group,
}

impl WireKind {
    /// The kind name as written in definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum => "enum",
            Self::Message => "message",
            Self::Group => "group",
        }
    }
}

/// Cardinality label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireLabel {
    /// Singular.
    #[default]
    Optional,
    /// Singular, proto2 required.
    Required,
    /// Repeated.
    Repeated,
}

/// One wire field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireFieldDef {
    /// Field name.
    pub name: String,
    /// Field number.
    pub number: u32,
    /// Value kind.
    #[serde(rename = "type")]
    pub kind: WireKind,
    /// Referenced enum or message name, possibly package-qualified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Cardinality label.
    #[serde(default)]
    pub label: WireLabel,
    /// Declared with proto3 `optional`.
    #[serde(default)]
    pub proto3_optional: bool,
    /// Oneof group this field belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<String>,
}

impl WireFieldDef {
    /// Whether the field tracks explicit presence: proto3 `optional` fields
    /// and oneof members.
    pub fn has_presence(&self) -> bool {
        self.proto3_optional || self.oneof.is_some()
    }
}

impl WireSchemaDef {
    /// Parse a definition from YAML (JSON is accepted as a YAML subset).
    pub fn from_yaml_str(input: &str) -> Result<Self, WirecheckError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Read and parse a definition file.
    pub fn from_path(path: &Path) -> Result<Self, WirecheckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Reflection trait
// ---------------------------------------------------------------------------

/// Read-only reflective view of a wire schema.
pub trait WireReflection {
    /// Name of the top-level message.
    fn root_message(&self) -> &str;
    /// Look up a message by unqualified name.
    fn message(&self, name: &str) -> Option<&MessageDef>;
    /// Look up an enum by unqualified name.
    fn enum_def(&self, name: &str) -> Option<&EnumDef>;
}

impl WireReflection for WireSchemaDef {
    fn root_message(&self) -> &str {
        &self.root
    }

    fn message(&self, name: &str) -> Option<&MessageDef> {
        self.messages.iter().find(|m| m.name == name)
    }

    fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extract the wire [`SchemaTree`] reachable from the source's root message.
pub fn extract_wire<W: WireReflection + ?Sized>(source: &W) -> Result<SchemaTree, CanonicalizationError> {
    let root = source.root_message();
    if source.message(root).is_none() {
        return Err(CanonicalizationError::UnknownReference {
            side: Side::Wire,
            name: root.to_string(),
            context: "root".to_string(),
        });
    }
    let mut walk = WireWalk {
        source,
        tree: SchemaTree::new(Side::Wire, root),
    };
    walk.visit(root, &FieldPath::root())?;
    tracing::debug!(
        root,
        messages = walk.tree.nodes.len(),
        fields = walk.tree.field_count(),
        "extracted wire schema"
    );
    Ok(walk.tree)
}

struct WireWalk<'a, W: ?Sized> {
    source: &'a W,
    tree: SchemaTree,
}

impl<'a, W: WireReflection + ?Sized> WireWalk<'a, W> {
    fn visit(&mut self, name: &str, path: &FieldPath) -> Result<(), CanonicalizationError> {
        if self.tree.contains(name) {
            return Ok(());
        }
        let source = self.source;
        let Some(def) = source.message(name) else {
            // Undeclared well-known types carry no fields.
            return Ok(());
        };
        self.tree.insert(SchemaNode::new(name));

        let unions = union_groups(def);
        let mut emitted: BTreeSet<&str> = BTreeSet::new();
        let mut node = SchemaNode::new(name);
        let mut nested = Vec::new();

        for field in &def.fields {
            let context = format!("{name}.{}", field.name);
            if let Some(group) = field.oneof.as_deref() {
                if !def.oneofs.iter().any(|o| o.name == group) {
                    return Err(CanonicalizationError::UnsupportedWireType {
                        context,
                        detail: format!("field names undeclared oneof `{group}`"),
                    });
                }
            }

            match field.oneof.as_deref().and_then(|g| unions.get_key_value(g)) {
                Some((&group, members)) => {
                    node.add_oneof_member(group, &field.name);
                    if !emitted.insert(group) {
                        continue;
                    }
                    let variants = members
                        .iter()
                        .map(|m| wire_base_type(source, m, &format!("{name}.{}", m.name)))
                        .collect::<Result<Vec<_>, _>>()?;
                    let ty = CanonicalType::union(variants, Some(group.to_string()));
                    let field_path = path.child(group);
                    nested_messages(&ty, &field_path, &mut nested);
                    node.fields
                        .push(FieldDescriptor::new(Side::Wire, field_path, group, ty).with_optional(true));
                }
                None => {
                    let ty = canonicalize_wire_field(source, name, field)?;
                    let field_path = path.child(&field.name);
                    let tracks_presence = ty.is_optional()
                        || (field.kind == WireKind::Message && !ty.is_list_shaped() && !ty.is_map_shaped());
                    nested_messages(&ty, &field_path, &mut nested);
                    node.fields.push(
                        FieldDescriptor::new(Side::Wire, field_path, &field.name, ty).with_optional(tracks_presence),
                    );
                }
            }
        }
        self.tree.insert(node);

        for (nested_path, nested_name) in nested {
            self.visit(&nested_name, &nested_path)?;
        }
        Ok(())
    }
}

/// Non-synthetic oneof groups with more than one member, in member order.
fn union_groups(def: &MessageDef) -> BTreeMap<&str, Vec<&WireFieldDef>> {
    let mut groups: BTreeMap<&str, Vec<&WireFieldDef>> = BTreeMap::new();
    for field in &def.fields {
        let Some(group) = field.oneof.as_deref() else { continue };
        if def.oneofs.iter().any(|o| o.name == group && !o.is_synthetic()) {
            groups.entry(group).or_default().push(field);
        }
    }
    groups.retain(|_, members| members.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirecheck_core::PrimitiveKind;

    const DOC: &str = r#"
root: Doc
package: ai.docling.core.v1
enums:
  - { name: Origin, values: [ORIGIN_UNSPECIFIED, TOPLEFT] }
messages:
  - name: Doc
    oneofs:
      - { name: content }
      - { name: _title, synthetic: true }
      - { name: single }
    fields:
      - { name: title, number: 1, type: string, proto3_optional: true, oneof: _title }
      - { name: text, number: 2, type: message, type_name: TextItem, oneof: content }
      - { name: heading, number: 3, type: message, type_name: HeadingItem, oneof: content }
      - { name: pages, number: 4, type: message, type_name: Doc.PagesEntry, label: repeated }
      - { name: only, number: 5, type: int32, oneof: single }
      - { name: children, number: 6, type: message, type_name: Doc, label: repeated }
      - { name: origin, number: 7, type: enum, type_name: Origin }
  - name: PagesEntry
    map_entry: true
    fields:
      - { name: key, number: 1, type: int32 }
      - { name: value, number: 2, type: message, type_name: Page }
  - name: Page
    fields:
      - { name: page_no, number: 1, type: int32 }
  - name: TextItem
    fields:
      - { name: text, number: 1, type: string }
  - name: HeadingItem
    fields:
      - { name: level, number: 1, type: int32 }
  - name: Unreachable
"#;

    fn tree() -> SchemaTree {
        extract_wire(&WireSchemaDef::from_yaml_str(DOC).unwrap()).unwrap()
    }

    #[test]
    fn reachable_messages_without_map_entries() {
        let tree = tree();
        let names: Vec<&str> = tree.nodes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Doc", "HeadingItem", "Page", "TextItem"]);
    }

    #[test]
    fn real_oneof_collapses_to_union() {
        let tree = tree();
        let doc = tree.root_node().unwrap();
        let content = doc.field("content").unwrap();
        assert_eq!(
            content.canonical_type,
            CanonicalType::union(
                [CanonicalType::message("TextItem"), CanonicalType::message("HeadingItem")],
                Some("content".to_string())
            )
        );
        assert!(doc.field("text").is_none());
        assert_eq!(doc.group_of("heading"), Some("content"));
        let heading = tree.node("HeadingItem").unwrap();
        assert_eq!(heading.field("level").unwrap().path.as_str(), "content.HeadingItem.level");
    }

    #[test]
    fn synthetic_and_single_member_oneofs_are_presence_only() {
        let tree = tree();
        let doc = tree.root_node().unwrap();
        let title = doc.field("title").unwrap();
        assert_eq!(title.canonical_type, CanonicalType::optional(CanonicalType::string()));
        assert!(title.is_optional);
        let only = doc.field("only").unwrap();
        assert_eq!(
            only.canonical_type,
            CanonicalType::optional(CanonicalType::primitive(PrimitiveKind::Int32))
        );
        assert!(doc.oneof_groups.get("_title").is_none());
    }

    #[test]
    fn map_fields_skip_the_entry_segment() {
        let tree = tree();
        let doc = tree.root_node().unwrap();
        let pages = doc.field("pages").unwrap();
        assert!(pages.is_repeated);
        assert!(!pages.is_optional);
        let page = tree.node("Page").unwrap();
        assert_eq!(page.field("page_no").unwrap().path.as_str(), "pages.page_no");
    }

    #[test]
    fn recursive_messages_are_one_node() {
        let tree = tree();
        let doc = tree.root_node().unwrap();
        assert_eq!(
            doc.field("children").unwrap().canonical_type,
            CanonicalType::list(CanonicalType::message("Doc"))
        );
        assert_eq!(tree.nodes.len(), 4);
    }

    #[test]
    fn undeclared_oneof_is_rejected() {
        let mut def = WireSchemaDef::from_yaml_str(DOC).unwrap();
        def.messages[0].fields[0].oneof = Some("nope".to_string());
        let err = extract_wire(&def).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn missing_root_is_rejected() {
        let mut def = WireSchemaDef::from_yaml_str(DOC).unwrap();
        def.root = "Missing".to_string();
        assert!(matches!(
            extract_wire(&def),
            Err(CanonicalizationError::UnknownReference { side: Side::Wire, .. })
        ));
    }
}
