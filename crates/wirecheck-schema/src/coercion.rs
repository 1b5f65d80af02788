//! # Allowed Coercions
//!
//! A version-controlled allowlist of nominal mismatches known to be safe,
//! each scoped to a path (exact or `**.segment` wildcard) and a pair of type
//! patterns. A matching entry downgrades a type mismatch to INFO. Absence
//! means FAIL.
//!
//! Cardinality mismatches are never consulted against this list.
//!
//! ## Type patterns
//!
//! ```text
//! *                 any type
//! int               any integer width
//! string int32 ...  exactly that primitive
//! enum  enum:Name   any enum / the named enum
//! message  message:Name
//! map<K,V>  list<E> component-wise, `*` allowed
//! ```
//!
//! Patterns see through `Optional` at every level.

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{all_consuming, opt},
    error::{Error, ErrorKind},
    sequence::{delimited, preceded, separated_pair},
    IResult,
};
use serde::{Deserialize, Serialize};

use wirecheck_core::{CanonicalType, ConfigError, FieldPath, PrimitiveKind};

use crate::rules::validate_path_pattern;
use crate::typeexpr::ws;

/// A pattern over canonical types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypePattern {
    /// `*`
    Any,
    /// `int`: any integer width.
    AnyInteger,
    /// An exact primitive kind.
    Primitive(PrimitiveKind),
    /// `enum`
    AnyEnum,
    /// `enum:Name`
    Enum(String),
    /// `message`
    AnyMessage,
    /// `message:Name`
    Message(String),
    /// `map<K,V>`
    Map(Box<TypePattern>, Box<TypePattern>),
    /// `list<E>`
    List(Box<TypePattern>),
}

impl TypePattern {
    /// Whether `ty` (seen through `Optional`) matches.
    pub fn matches(&self, ty: &CanonicalType) -> bool {
        let ty = ty.strip_optional();
        match (self, ty) {
            (Self::Any, _) => true,
            (Self::AnyInteger, CanonicalType::Primitive { kind }) => kind.is_integer(),
            (Self::Primitive(expected), CanonicalType::Primitive { kind }) => expected == kind,
            (Self::AnyEnum, CanonicalType::Enum { .. }) => true,
            (Self::Enum(expected), CanonicalType::Enum { name }) => expected == name,
            (Self::AnyMessage, CanonicalType::Message { .. }) => true,
            (Self::Message(expected), CanonicalType::Message { name }) => expected == name,
            (Self::Map(k, v), CanonicalType::Map { key, value }) => k.matches(key) && v.matches(value),
            (Self::List(e), CanonicalType::List { element }) => e.matches(element),
            _ => false,
        }
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::AnyInteger => f.write_str("int"),
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::AnyEnum => f.write_str("enum"),
            Self::Enum(name) => write!(f, "enum:{name}"),
            Self::AnyMessage => f.write_str("message"),
            Self::Message(name) => write!(f, "message:{name}"),
            Self::Map(k, v) => write!(f, "map<{k},{v}>"),
            Self::List(e) => write!(f, "list<{e}>"),
        }
    }
}

impl FromStr for TypePattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(ws(pattern))(s)
            .map(|(_, parsed)| parsed)
            .map_err(|e| ConfigError::InvalidTypePattern {
                pattern: s.to_string(),
                reason: e.to_string(),
            })
    }
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn qualified_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')(input)
}

fn pattern(input: &str) -> IResult<&str, TypePattern> {
    if let Ok((rest, _)) = char::<&str, Error<&str>>('*')(input) {
        return Ok((rest, TypePattern::Any));
    }
    let (rest, head) = word(input)?;
    match head {
        "map" => {
            let (rest, (k, v)) = delimited(
                ws(char('<')),
                separated_pair(ws(pattern), char(','), ws(pattern)),
                ws(char('>')),
            )(rest)?;
            Ok((rest, TypePattern::Map(Box::new(k), Box::new(v))))
        }
        "list" => {
            let (rest, e) = delimited(ws(char('<')), ws(pattern), ws(char('>')))(rest)?;
            Ok((rest, TypePattern::List(Box::new(e))))
        }
        "enum" => {
            let (rest, name) = opt(preceded(char(':'), qualified_name))(rest)?;
            Ok((rest, name.map_or(TypePattern::AnyEnum, |n| TypePattern::Enum(n.to_string()))))
        }
        "message" => {
            let (rest, name) = opt(preceded(char(':'), qualified_name))(rest)?;
            Ok((rest, name.map_or(TypePattern::AnyMessage, |n| TypePattern::Message(n.to_string()))))
        }
        "int" => Ok((rest, TypePattern::AnyInteger)),
        other => match other.parse::<PrimitiveKind>() {
            Ok(kind) => Ok((rest, TypePattern::Primitive(kind))),
            Err(_) => Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
        },
    }
}

// ---------------------------------------------------------------------------
// Allowlist
// ---------------------------------------------------------------------------

/// An allowlist entry as written in a registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoercionSpec {
    /// Applicability: exact path or `**.segment` wildcard.
    pub path: String,
    /// Domain-side type pattern.
    pub domain: String,
    /// Wire-side type pattern.
    pub wire: String,
    /// Why the coercion is safe.
    pub rationale: String,
}

/// One compiled allowlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedCoercion {
    /// Applicability pattern.
    pub path: String,
    /// Domain-side type pattern.
    pub domain: TypePattern,
    /// Wire-side type pattern.
    pub wire: TypePattern,
    /// Why the coercion is safe.
    pub rationale: String,
}

impl AllowedCoercion {
    /// Whether the entry covers this path and type pair.
    pub fn applies(&self, path: &FieldPath, domain: &CanonicalType, wire: &CanonicalType) -> bool {
        path.matches_exact(&self.path) && self.domain.matches(domain) && self.wire.matches(wire)
    }
}

impl fmt::Display for AllowedCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.path, self.domain, self.wire)
    }
}

impl TryFrom<CoercionSpec> for AllowedCoercion {
    type Error = ConfigError;

    fn try_from(spec: CoercionSpec) -> Result<Self, Self::Error> {
        validate_path_pattern(&spec.path)?;
        Ok(Self {
            domain: spec.domain.parse()?,
            wire: spec.wire.parse()?,
            path: spec.path,
            rationale: spec.rationale,
        })
    }
}

/// The immutable allowlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionList {
    entries: Vec<AllowedCoercion>,
}

impl CoercionList {
    /// An empty allowlist: every nominal mismatch fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a list of specs.
    pub fn from_specs(specs: Vec<CoercionSpec>) -> Result<Self, ConfigError> {
        let entries = specs
            .into_iter()
            .map(AllowedCoercion::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[AllowedCoercion] {
        &self.entries
    }

    /// The first entry covering `(path, domain, wire)`.
    pub fn find(&self, path: &FieldPath, domain: &CanonicalType, wire: &CanonicalType) -> Option<&AllowedCoercion> {
        self.entries.iter().find(|entry| entry.applies(path, domain, wire))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn primitive() -> impl Strategy<Value = CanonicalType> {
        prop_oneof![
            Just(CanonicalType::string()),
            Just(CanonicalType::primitive(PrimitiveKind::Int32)),
            Just(CanonicalType::primitive(PrimitiveKind::Int64)),
            Just(CanonicalType::primitive(PrimitiveKind::Float)),
            Just(CanonicalType::primitive(PrimitiveKind::Bool)),
            Just(CanonicalType::enumeration("Label")),
        ]
    }

    proptest! {
        /// `*` matches everything and a pattern rendered from a type's own
        /// display form matches that type.
        #[test]
        fn rendered_patterns_match_their_type(ty in primitive(), optional in any::<bool>()) {
            let pattern: TypePattern = ty.to_string().parse().unwrap();
            let ty = if optional { CanonicalType::optional(ty) } else { ty };
            prop_assert!(pattern.matches(&ty));
            prop_assert!(TypePattern::Any.matches(&ty));
        }
    }
}
