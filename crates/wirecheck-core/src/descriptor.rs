//! # Field Descriptors & Schema Trees
//!
//! The metadata tables both extractors produce and the comparator reads.
//!
//! A [`SchemaTree`] holds every [`SchemaNode`] reachable from one root,
//! keyed by message (or model) name. Nested references stay by name, so a
//! recursive definition is one node that refers to itself rather than an
//! infinite expansion. Each [`FieldDescriptor`] carries the root-relative
//! path at which the depth-first extraction walk first reached it; that path
//! is unique within the tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalType;
use crate::path::FieldPath;

/// Which schema a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The in-process, source-of-truth object schema.
    Domain,
    /// The cross-process transport schema.
    Wire,
}

impl Side {
    /// Returns the side name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Wire => "wire",
        }
    }

    /// The other side.
    pub fn opposite(&self) -> Side {
        match self {
            Self::Domain => Self::Wire,
            Self::Wire => Self::Domain,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of one side, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as declared on its side.
    pub name: String,
    /// Root-relative path of first discovery.
    pub path: FieldPath,
    /// Normalized type.
    pub canonical_type: CanonicalType,
    /// Whether the field holds many values (list or map shaped).
    pub is_repeated: bool,
    /// Whether presence is tracked / the value may be absent.
    pub is_optional: bool,
    /// Origin of the descriptor.
    pub side: Side,
}

impl FieldDescriptor {
    /// Build a descriptor, deriving `is_repeated` and `is_optional` from the
    /// canonical type.
    pub fn new(side: Side, path: FieldPath, name: impl Into<String>, canonical_type: CanonicalType) -> Self {
        let is_repeated = canonical_type.is_list_shaped() || canonical_type.is_map_shaped();
        let is_optional = canonical_type.is_optional();
        Self {
            name: name.into(),
            path,
            canonical_type,
            is_repeated,
            is_optional,
            side,
        }
    }

    /// Override the optional flag, for fields whose presence is tracked
    /// without an `Optional` wrapper (wire message fields).
    pub fn with_optional(mut self, is_optional: bool) -> Self {
        self.is_optional = is_optional;
        self
    }
}

/// A message-like container on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    /// Message / model name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Oneof group name → member field names.
    pub oneof_groups: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaNode {
    /// An empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            oneof_groups: BTreeMap::new(),
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The oneof group containing `field_name`, if any.
    pub fn group_of(&self, field_name: &str) -> Option<&str> {
        self.oneof_groups
            .iter()
            .find(|(_, members)| members.contains(field_name))
            .map(|(group, _)| group.as_str())
    }

    /// Record `field_name` as a member of `group`.
    ///
    /// Returns `false` (and records nothing) if the field already belongs to
    /// a different group: a field is a member of at most one group.
    pub fn add_oneof_member(&mut self, group: &str, field_name: &str) -> bool {
        if let Some(existing) = self.group_of(field_name) {
            return existing == group;
        }
        self.oneof_groups
            .entry(group.to_string())
            .or_default()
            .insert(field_name.to_string());
        true
    }
}

/// Every node reachable from one root, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTree {
    /// Which side this tree describes.
    pub side: Side,
    /// Name of the root node.
    pub root: String,
    /// All reachable nodes.
    pub nodes: BTreeMap<String, SchemaNode>,
}

impl SchemaTree {
    /// An empty tree rooted at `root`.
    pub fn new(side: Side, root: impl Into<String>) -> Self {
        Self {
            side,
            root: root.into(),
            nodes: BTreeMap::new(),
        }
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&SchemaNode> {
        self.nodes.get(name)
    }

    /// The root node, if it was extracted.
    pub fn root_node(&self) -> Option<&SchemaNode> {
        self.nodes.get(&self.root)
    }

    /// Whether a node with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Insert a node, replacing any node with the same name.
    pub fn insert(&mut self, node: SchemaNode) {
        self.nodes.insert(node.name.clone(), node);
    }

    /// Total number of field descriptors across all nodes.
    pub fn field_count(&self) -> usize {
        self.nodes.values().map(|n| n.fields.len()).sum()
    }
}
