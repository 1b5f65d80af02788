//! # Canonicalization
//!
//! Maps both sides' native type descriptions into [`CanonicalType`].
//!
//! ## Domain side
//!
//! Type expressions are parsed by [`crate::typeexpr`] and classified here:
//!
//! - `annotated[T, ...]` and declared newtypes are stripped to their
//!   underlying type.
//! - `tuple[A, B]` of two scalars is a [`CanonicalType::Pair`]; `tuple[T, ...]`
//!   is list-shaped. Other tuples are unsupported.
//! - `optional[T]` and any union containing `None` become `Optional`.
//! - Path-like names are string-serializable: in a union with one real type
//!   they collapse away, alone they are `string`.
//! - URL and DSN types are `string`.
//! - `Any` is the dynamic-value message [`DYNAMIC_VALUE`].
//!
//! ## Wire side
//!
//! Every integer width is `int32` or `int64`, every float width is `float`.
//! Repeated fields are `List`, map-entry messages are `Map`, and scalar
//! fields with explicit presence are `Optional`. `group` fields are rejected.
//!
//! ## Invariants
//!
//! Canonicalization is pure and deterministic. Every input outside the
//! supported universe fails with a [`CanonicalizationError`]; nothing is
//! guessed.

use wirecheck_core::{CanonicalType, CanonicalizationError, FieldPath, PrimitiveKind, Side};

use crate::domain::{DomainSource, NamedType};
use crate::typeexpr::TypeExpr;
use crate::wire::{MessageDef, WireFieldDef, WireKind, WireLabel, WireReflection};

/// Dynamic value message (`Any` on the domain side).
pub const DYNAMIC_VALUE: &str = "Value";
/// Dynamic string-keyed mapping message.
pub const DYNAMIC_STRUCT: &str = "Struct";
/// Dynamic list message.
pub const DYNAMIC_LIST: &str = "ListValue";
/// Messages a wire schema may reference without declaring.
pub const WELL_KNOWN_MESSAGES: &[&str] = &[DYNAMIC_VALUE, DYNAMIC_STRUCT, DYNAMIC_LIST];

/// URL and DSN types serialized as plain strings.
pub const STRING_LIKE_TYPES: &[&str] = &[
    "AnyUrl",
    "HttpUrl",
    "AnyHttpUrl",
    "FileUrl",
    "PostgresDsn",
    "RedisDsn",
    "MongoDsn",
    "KafkaDsn",
    "Url",
    "MultiHostUrl",
];

/// Filesystem path types, string-serializable auxiliaries.
pub const PATH_LIKE_TYPES: &[&str] = &["Path", "PurePath", "PosixPath", "FilePath", "DirectoryPath"];

const MAX_NEWTYPE_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Classifies domain type expressions against one [`DomainSource`].
pub struct DomainCanonicalizer<'a, S: ?Sized> {
    source: &'a S,
}

impl<'a, S: DomainSource + ?Sized> DomainCanonicalizer<'a, S> {
    /// A canonicalizer resolving names against `source`.
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Parse and classify a type expression declared at `context`.
    pub fn canonicalize_str(&self, expr: &str, context: &str) -> Result<CanonicalType, CanonicalizationError> {
        let parsed = parse_expr(expr, context)?;
        self.canonicalize(&parsed, context)
    }

    /// Classify an already parsed type expression.
    pub fn canonicalize(&self, expr: &TypeExpr, context: &str) -> Result<CanonicalType, CanonicalizationError> {
        self.classify(expr, context, 0)
    }

    fn classify(&self, expr: &TypeExpr, context: &str, depth: usize) -> Result<CanonicalType, CanonicalizationError> {
        match expr {
            TypeExpr::Name(name) => self.classify_name(name, context, depth),
            TypeExpr::Apply { head, args } => self.classify_apply(head, args, context, depth),
            TypeExpr::Str(_) | TypeExpr::Ellipsis => {
                Err(unsupported(context, format!("`{expr}` is not a type")))
            }
        }
    }

    fn classify_name(&self, name: &str, context: &str, depth: usize) -> Result<CanonicalType, CanonicalizationError> {
        if let Some(kind) = builtin_primitive(name) {
            return Ok(CanonicalType::primitive(kind));
        }
        if STRING_LIKE_TYPES.contains(&name) || PATH_LIKE_TYPES.contains(&name) {
            return Ok(CanonicalType::string());
        }
        match name {
            "None" | "NoneType" => {
                return Err(unsupported(context, "bare None outside an optional or union"));
            }
            "Any" | "object" => return Ok(CanonicalType::message(DYNAMIC_VALUE)),
            _ => {}
        }

        match self.source.lookup(name) {
            Some(NamedType::Model) => Ok(CanonicalType::message(name)),
            Some(NamedType::Enum(_)) => Ok(CanonicalType::enumeration(name)),
            Some(NamedType::NewType(inner)) => {
                if depth >= MAX_NEWTYPE_DEPTH {
                    return Err(unsupported(context, format!("newtype `{name}` does not resolve")));
                }
                let parsed = parse_expr(inner, context)?;
                self.classify(&parsed, context, depth + 1)
            }
            None => match name.to_ascii_lowercase().as_str() {
                // Bare generics are parameterized by `Any`.
                "list" | "set" | "frozenset" | "sequence" => {
                    Ok(CanonicalType::list(CanonicalType::message(DYNAMIC_VALUE)))
                }
                "dict" | "mapping" => Ok(CanonicalType::map(
                    CanonicalType::string(),
                    CanonicalType::message(DYNAMIC_VALUE),
                )),
                _ => Err(CanonicalizationError::UnknownReference {
                    side: Side::Domain,
                    name: name.to_string(),
                    context: context.to_string(),
                }),
            },
        }
    }

    fn classify_apply(
        &self,
        head: &str,
        args: &[TypeExpr],
        context: &str,
        depth: usize,
    ) -> Result<CanonicalType, CanonicalizationError> {
        let lower = head.to_ascii_lowercase();
        match lower.as_str() {
            "list" | "set" | "frozenset" | "sequence" => {
                expect_arity(head, args, 1, context)?;
                Ok(CanonicalType::list(self.classify(&args[0], context, depth)?))
            }
            "dict" | "mapping" => {
                expect_arity(head, args, 2, context)?;
                let key = self.classify(&args[0], context, depth)?;
                let value = self.classify(&args[1], context, depth)?;
                Ok(CanonicalType::map(key, value))
            }
            "tuple" => self.classify_tuple(args, context, depth),
            "optional" => {
                expect_arity(head, args, 1, context)?;
                Ok(CanonicalType::optional(self.classify(&args[0], context, depth)?))
            }
            "union" => self.classify_union(args, context, depth),
            "literal" => self.classify_literal(args, context),
            "annotated" => match args.first() {
                Some(inner) => self.classify(inner, context, depth),
                None => Err(unsupported(context, "annotated[] without a type")),
            },
            _ => Err(unsupported(context, format!("unsupported generic `{head}`"))),
        }
    }

    fn classify_tuple(&self, args: &[TypeExpr], context: &str, depth: usize) -> Result<CanonicalType, CanonicalizationError> {
        match args {
            [element, TypeExpr::Ellipsis] => Ok(CanonicalType::list(self.classify(element, context, depth)?)),
            [first, second] => {
                let first = self.classify(first, context, depth)?;
                let second = self.classify(second, context, depth)?;
                match (first, second) {
                    (CanonicalType::Primitive { kind: a }, CanonicalType::Primitive { kind: b }) => {
                        Ok(CanonicalType::pair(a, b))
                    }
                    (a, b) => Err(unsupported(context, format!("tuple of non-scalar elements ({a}, {b})"))),
                }
            }
            _ => Err(unsupported(context, format!("tuple of {} elements", args.len()))),
        }
    }

    fn classify_union(&self, args: &[TypeExpr], context: &str, depth: usize) -> Result<CanonicalType, CanonicalizationError> {
        let mut nullable = false;
        let mut path_like = false;
        let mut real = Vec::new();
        for arg in args {
            match arg {
                TypeExpr::Name(name) if name == "None" || name == "NoneType" => nullable = true,
                TypeExpr::Name(name) if PATH_LIKE_TYPES.contains(&name.as_str()) => path_like = true,
                other => match self.classify(other, context, depth)? {
                    CanonicalType::Optional { inner } => {
                        nullable = true;
                        push_flattened(&mut real, *inner);
                    }
                    ty => push_flattened(&mut real, ty),
                },
            }
        }

        if path_like && real.is_empty() {
            real.push(CanonicalType::string());
        } else if path_like && real.len() > 1 {
            push_flattened(&mut real, CanonicalType::string());
        }

        let core = match CanonicalType::union(real, None) {
            CanonicalType::Union { mut variants, .. } if variants.len() == 1 => variants.remove(0),
            CanonicalType::Union { variants, .. } if variants.is_empty() => {
                return Err(unsupported(context, "union without a non-None member"));
            }
            union => union,
        };
        Ok(if nullable { CanonicalType::optional(core) } else { core })
    }

    fn classify_literal(&self, args: &[TypeExpr], context: &str) -> Result<CanonicalType, CanonicalizationError> {
        if !args.is_empty() && args.iter().all(|a| matches!(a, TypeExpr::Str(_))) {
            return Ok(CanonicalType::string());
        }
        // `literal[Enum.MEMBER, ...]` over a single enum is that enum.
        let mut owner: Option<&str> = None;
        for arg in args {
            let TypeExpr::Name(name) = arg else {
                return Err(unsupported(context, "mixed literal"));
            };
            let Some((enum_name, _member)) = name.rsplit_once('.') else {
                return Err(unsupported(context, format!("literal member `{name}` is not a string or enum member")));
            };
            if !matches!(self.source.lookup(enum_name), Some(NamedType::Enum(_))) {
                return Err(CanonicalizationError::UnknownReference {
                    side: Side::Domain,
                    name: enum_name.to_string(),
                    context: context.to_string(),
                });
            }
            match owner {
                Some(existing) if existing != enum_name => {
                    return Err(unsupported(context, "literal over more than one enum"));
                }
                _ => owner = Some(enum_name),
            }
        }
        match owner {
            Some(enum_name) => Ok(CanonicalType::enumeration(enum_name)),
            None => Err(unsupported(context, "empty literal")),
        }
    }
}

fn push_flattened(out: &mut Vec<CanonicalType>, ty: CanonicalType) {
    match ty {
        CanonicalType::Union { variants, .. } => out.extend(variants),
        other => out.push(other),
    }
}

fn builtin_primitive(name: &str) -> Option<PrimitiveKind> {
    match name {
        "str" => Some(PrimitiveKind::String),
        "int" => Some(PrimitiveKind::Int64),
        "float" => Some(PrimitiveKind::Float),
        "bool" => Some(PrimitiveKind::Bool),
        "bytes" => Some(PrimitiveKind::Bytes),
        _ => None,
    }
}

fn parse_expr(expr: &str, context: &str) -> Result<TypeExpr, CanonicalizationError> {
    TypeExpr::parse(expr).map_err(|detail| CanonicalizationError::TypeExprSyntax {
        expr: expr.to_string(),
        context: context.to_string(),
        detail,
    })
}

fn expect_arity(head: &str, args: &[TypeExpr], n: usize, context: &str) -> Result<(), CanonicalizationError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(unsupported(context, format!("`{head}` takes {n} argument(s), got {}", args.len())))
    }
}

fn unsupported(context: &str, detail: impl Into<String>) -> CanonicalizationError {
    CanonicalizationError::UnsupportedDomainType {
        context: context.to_string(),
        detail: detail.into(),
    }
}

/// Attach `discriminator` to the first union reachable through `Optional`
/// and `List` wrappers.
pub fn with_discriminator(ty: CanonicalType, discriminator: &str) -> CanonicalType {
    match ty {
        CanonicalType::Union { variants, .. } => CanonicalType::Union {
            variants,
            discriminator: Some(discriminator.to_string()),
        },
        CanonicalType::Optional { inner } => CanonicalType::optional(with_discriminator(*inner, discriminator)),
        CanonicalType::List { element } => CanonicalType::list(with_discriminator(*element, discriminator)),
        other => other,
    }
}

/// Collect the message references inside `ty`, with the path each one is
/// reached at. Collections and optionals add no segment; union variants add
/// the variant's message name.
pub fn nested_messages(ty: &CanonicalType, path: &FieldPath, out: &mut Vec<(FieldPath, String)>) {
    match ty {
        CanonicalType::Message { name } => out.push((path.clone(), name.clone())),
        CanonicalType::List { element } => nested_messages(element, path, out),
        CanonicalType::Map { value, .. } => nested_messages(value, path, out),
        CanonicalType::Optional { inner } => nested_messages(inner, path, out),
        CanonicalType::Union { variants, .. } => {
            for variant in variants {
                match variant.message_name() {
                    Some(name) => nested_messages(variant, &path.child(name), out),
                    None => nested_messages(variant, path, out),
                }
            }
        }
        CanonicalType::Primitive { .. } | CanonicalType::Enum { .. } | CanonicalType::Pair { .. } => {}
    }
}

// ---------------------------------------------------------------------------
// Wire
// ---------------------------------------------------------------------------

/// Canonical type of one wire field, including cardinality and presence.
///
/// Members of a folded oneof group are canonicalized with
/// [`wire_base_type`] instead: the union carries their presence.
pub fn canonicalize_wire_field<W: WireReflection + ?Sized>(
    source: &W,
    message: &str,
    field: &WireFieldDef,
) -> Result<CanonicalType, CanonicalizationError> {
    let context = format!("{message}.{}", field.name);
    if field.kind == WireKind::Message {
        let target = referenced_name(field, &context)?;
        if let Some(entry) = source.message(target).filter(|m| m.map_entry) {
            return map_entry_type(source, entry);
        }
    }

    let base = wire_base_type(source, field, &context)?;
    if field.label == WireLabel::Repeated {
        Ok(CanonicalType::list(base))
    } else if field.kind != WireKind::Message && field.has_presence() {
        Ok(CanonicalType::optional(base))
    } else {
        Ok(base)
    }
}

/// Canonical type of a single wire value, ignoring label and presence.
pub fn wire_base_type<W: WireReflection + ?Sized>(
    source: &W,
    field: &WireFieldDef,
    context: &str,
) -> Result<CanonicalType, CanonicalizationError> {
    let kind = match field.kind {
        WireKind::Double | WireKind::Float => PrimitiveKind::Float,
        WireKind::Int32 | WireKind::Uint32 | WireKind::Sint32 | WireKind::Fixed32 | WireKind::Sfixed32 => {
            PrimitiveKind::Int32
        }
        WireKind::Int64 | WireKind::Uint64 | WireKind::Sint64 | WireKind::Fixed64 | WireKind::Sfixed64 => {
            PrimitiveKind::Int64
        }
        WireKind::Bool => PrimitiveKind::Bool,
        WireKind::String => PrimitiveKind::String,
        WireKind::Bytes => PrimitiveKind::Bytes,
        WireKind::Enum => {
            let name = referenced_name(field, context)?;
            if source.enum_def(name).is_none() {
                return Err(unknown_wire(name, context));
            }
            return Ok(CanonicalType::enumeration(name));
        }
        WireKind::Message => {
            let name = referenced_name(field, context)?;
            if source.message(name).is_none() && !WELL_KNOWN_MESSAGES.contains(&name) {
                return Err(unknown_wire(name, context));
            }
            return Ok(CanonicalType::message(name));
        }
        WireKind::Group => {
            return Err(CanonicalizationError::UnsupportedWireType {
                context: context.to_string(),
                detail: "group fields are not supported".to_string(),
            });
        }
    };
    Ok(CanonicalType::primitive(kind))
}

fn map_entry_type<W: WireReflection + ?Sized>(source: &W, entry: &MessageDef) -> Result<CanonicalType, CanonicalizationError> {
    let malformed = |detail: &str| CanonicalizationError::MalformedMapEntry {
        message: entry.name.clone(),
        detail: detail.to_string(),
    };
    if entry.fields.len() != 2 {
        return Err(malformed(&format!("expected 2 fields, found {}", entry.fields.len())));
    }
    let key = entry
        .fields
        .iter()
        .find(|f| f.name == "key")
        .ok_or_else(|| malformed("missing key field"))?;
    let value = entry
        .fields
        .iter()
        .find(|f| f.name == "value")
        .ok_or_else(|| malformed("missing value field"))?;

    let key_type = wire_base_type(source, key, &format!("{}.key", entry.name))?;
    if !key_type.is_scalar() {
        return Err(malformed("key is not a scalar"));
    }
    let value_type = wire_base_type(source, value, &format!("{}.value", entry.name))?;
    Ok(CanonicalType::map(key_type, value_type))
}

/// Unqualified name referenced by an enum or message field.
fn referenced_name<'f>(field: &'f WireFieldDef, context: &str) -> Result<&'f str, CanonicalizationError> {
    let qualified = field
        .type_name
        .as_deref()
        .ok_or_else(|| CanonicalizationError::UnsupportedWireType {
            context: context.to_string(),
            detail: format!("{} field without type_name", field.kind.as_str()),
        })?;
    Ok(qualified.rsplit('.').next().unwrap_or(qualified))
}

fn unknown_wire(name: &str, context: &str) -> CanonicalizationError {
    CanonicalizationError::UnknownReference {
        side: Side::Wire,
        name: name.to_string(),
        context: context.to_string(),
    }
}
