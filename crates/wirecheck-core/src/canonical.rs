//! # Canonical Types: The Shared Type Algebra
//!
//! Defines [`CanonicalType`], the side-neutral representation both schemas
//! are normalized into before comparison.
//!
//! ## Invariants
//!
//! - A canonical type is immutable once constructed. All constructors return
//!   owned values; there are no `&mut` accessors.
//! - Equality is structural: by variant, then recursively by payload.
//! - `Optional` never directly wraps another `Optional`
//!   ([`CanonicalType::optional`] collapses the nesting).
//! - `Union` variants form an ordered set: duplicates are dropped at
//!   construction, first occurrence wins.
//!
//! ## Rendering
//!
//! The `Display` form is compact and stable (`list<message:RefItem>`,
//! `map<string,message:PageItem>`, `optional<int64>`). Reports and allowlist
//! diagnostics are rendered from it, so it must never change for an
//! unchanged type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A scalar kind shared by both sides.
///
/// All integer widths are mutually compatible and all float widths collapse
/// into [`PrimitiveKind::Float`]; the distinction between `Int32` and `Int64`
/// is kept only so that reports show the declared wire width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// UTF-8 text.
    String,
    /// 32-bit (or narrower) integer.
    Int32,
    /// 64-bit integer. Domain-side `int` canonicalizes here.
    Int64,
    /// Floating point of any precision.
    Float,
    /// Boolean.
    Bool,
    /// Opaque byte string.
    Bytes,
}

impl PrimitiveKind {
    /// Returns the canonical name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
        }
    }

    /// Whether this kind is an integer of any width.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    /// Whether a value of this kind is interchangeable with `other`.
    ///
    /// Integer widths are mutually compatible; everything else compares by
    /// identity.
    pub fn compatible_with(&self, other: &PrimitiveKind) -> bool {
        self == other || (self.is_integer() && other.is_integer())
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimitiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "bytes" => Ok(Self::Bytes),
            other => Err(format!("unknown primitive kind \"{other}\"")),
        }
    }
}

/// A type in the shared canonical algebra.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalType {
    /// A scalar value.
    Primitive {
        /// The scalar kind.
        kind: PrimitiveKind,
    },
    /// A named enumeration.
    Enum {
        /// Enumeration name (unqualified).
        name: String,
    },
    /// A named message / model.
    Message {
        /// Message name (unqualified).
        name: String,
    },
    /// An ordered sequence.
    List {
        /// Element type.
        element: Box<CanonicalType>,
    },
    /// A keyed collection.
    Map {
        /// Key type.
        key: Box<CanonicalType>,
        /// Value type.
        value: Box<CanonicalType>,
    },
    /// A value whose presence is tracked individually.
    Optional {
        /// The wrapped type. Never itself `Optional`.
        inner: Box<CanonicalType>,
    },
    /// Exactly one of several typed alternatives.
    Union {
        /// Ordered set of alternatives.
        variants: Vec<CanonicalType>,
        /// Name of the discriminating group, when one exists.
        discriminator: Option<String>,
    },
    /// A fixed two-element tuple of scalars.
    ///
    /// Only produced on the domain side. It is not list-shaped: it is
    /// structurally equivalent to a wire message with exactly two fields of
    /// matching kinds.
    Pair {
        /// Kind of the first element.
        first: PrimitiveKind,
        /// Kind of the second element.
        second: PrimitiveKind,
    },
}

impl CanonicalType {
    /// A primitive of the given kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive { kind }
    }

    /// Shorthand for `Primitive { kind: String }`.
    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    /// A named enumeration.
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum { name: name.into() }
    }

    /// A named message.
    pub fn message(name: impl Into<String>) -> Self {
        Self::Message { name: name.into() }
    }

    /// A list of `element`.
    pub fn list(element: CanonicalType) -> Self {
        Self::List {
            element: Box::new(element),
        }
    }

    /// A map from `key` to `value`.
    pub fn map(key: CanonicalType, value: CanonicalType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// An optional `inner`. Wrapping an already optional type is a no-op.
    pub fn optional(inner: CanonicalType) -> Self {
        match inner {
            opt @ Self::Optional { .. } => opt,
            other => Self::Optional {
                inner: Box::new(other),
            },
        }
    }

    /// A union over `variants`, deduplicated in first-occurrence order.
    pub fn union(variants: impl IntoIterator<Item = CanonicalType>, discriminator: Option<String>) -> Self {
        let mut ordered: Vec<CanonicalType> = Vec::new();
        for variant in variants {
            if !ordered.contains(&variant) {
                ordered.push(variant);
            }
        }
        Self::Union {
            variants: ordered,
            discriminator,
        }
    }

    /// A fixed scalar pair.
    pub fn pair(first: PrimitiveKind, second: PrimitiveKind) -> Self {
        Self::Pair { first, second }
    }

    /// Strip one level of `Optional`, if present.
    pub fn strip_optional(&self) -> &CanonicalType {
        match self {
            Self::Optional { inner } => inner,
            other => other,
        }
    }

    /// Whether the top level is `Optional`.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional { .. })
    }

    /// Whether the type (ignoring optionality) is a `List`.
    pub fn is_list_shaped(&self) -> bool {
        matches!(self.strip_optional(), Self::List { .. })
    }

    /// Whether the type (ignoring optionality) is a `Map`.
    pub fn is_map_shaped(&self) -> bool {
        matches!(self.strip_optional(), Self::Map { .. })
    }

    /// Whether the type (ignoring optionality) is a `Union`.
    pub fn is_union_shaped(&self) -> bool {
        matches!(self.strip_optional(), Self::Union { .. })
    }

    /// The message name, if the type (ignoring optionality) is a `Message`.
    pub fn message_name(&self) -> Option<&str> {
        match self.strip_optional() {
            Self::Message { name } => Some(name),
            _ => None,
        }
    }

    /// Whether the type is a scalar leaf: a primitive or an enum,
    /// optionally wrapped.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.strip_optional(),
            Self::Primitive { .. } | Self::Enum { .. }
        )
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive { kind } => write!(f, "{kind}"),
            Self::Enum { name } => write!(f, "enum:{name}"),
            Self::Message { name } => write!(f, "message:{name}"),
            Self::List { element } => write!(f, "list<{element}>"),
            Self::Map { key, value } => write!(f, "map<{key},{value}>"),
            Self::Optional { inner } => write!(f, "optional<{inner}>"),
            Self::Union { variants, .. } => {
                f.write_str("union<")?;
                for (i, variant) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{variant}")?;
                }
                f.write_str(">")
            }
            Self::Pair { first, second } => write!(f, "tuple<{first},{second}>"),
        }
    }
}
