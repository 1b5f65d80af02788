//! # Domain Type Expressions
//!
//! Parses the annotation-style type expressions used in domain schema
//! definitions (`list[union[TitleItem, TextItem]]`, `optional[str]`,
//! `str | None`, `literal['a', 'b']`) into a small [`TypeExpr`] AST.
//!
//! The parser is purely syntactic. Name resolution and classification into
//! the canonical algebra happen in [`crate::canonicalize`].
//!
//! ## Grammar
//!
//! ```text
//! expr     := term ( '|' term )*
//! term     := '...' | string | apply
//! apply    := ident ( '[' expr ( ',' expr )* ','? ']' )?
//! ident    := [A-Za-z_][A-Za-z0-9_.]*
//! string   := '\'' [^']* '\'' | '"' [^"]* '"'
//! ```
//!
//! `a | b` is sugar for `union[a, b]`.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, terminated},
    IResult,
};

/// A parsed domain type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A bare name: `str`, `Path`, `TitleItem`, `DocItemLabel.TITLE`.
    Name(String),
    /// A generic application: `list[T]`, `dict[K, V]`.
    Apply {
        /// The generic's name as written.
        head: String,
        /// Type arguments in order.
        args: Vec<TypeExpr>,
    },
    /// A quoted literal, only meaningful inside `literal[...]` and
    /// `annotated[...]` metadata.
    Str(String),
    /// `...`, only meaningful as the second argument of a variadic tuple.
    Ellipsis,
}

impl TypeExpr {
    /// Parse a complete expression. Leading and trailing whitespace is
    /// ignored; anything else left over is an error.
    pub fn parse(input: &str) -> Result<TypeExpr, String> {
        match all_consuming(expr)(input) {
            Ok((_, parsed)) => Ok(parsed),
            Err(e) => Err(e.to_string()),
        }
    }

    /// The lower-cased head of an application, or the name itself.
    pub fn head(&self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name.to_ascii_lowercase()),
            Self::Apply { head, .. } => Some(head.to_ascii_lowercase()),
            Self::Str(_) | Self::Ellipsis => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Apply { head, args } => {
                write!(f, "{head}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

pub(crate) fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, TypeExpr> {
    map(
        alt((
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        )),
        |s: &str| TypeExpr::Str(s.to_string()),
    )(input)
}

fn ellipsis(input: &str) -> IResult<&str, TypeExpr> {
    map(tag("..."), |_| TypeExpr::Ellipsis)(input)
}

fn apply(input: &str) -> IResult<&str, TypeExpr> {
    let (input, head) = ident(input)?;
    let (input, args) = opt(delimited(
        ws(char('[')),
        terminated(separated_list1(ws(char(',')), expr), opt(ws(char(',')))),
        ws(char(']')),
    ))(input)?;
    let parsed = match args {
        Some(args) => TypeExpr::Apply {
            head: head.to_string(),
            args,
        },
        None => TypeExpr::Name(head.to_string()),
    };
    Ok((input, parsed))
}

fn term(input: &str) -> IResult<&str, TypeExpr> {
    alt((ellipsis, string_literal, apply))(input)
}

fn expr(input: &str) -> IResult<&str, TypeExpr> {
    let (input, mut terms) = separated_list1(ws(char('|')), ws(term))(input)?;
    let parsed = if terms.len() == 1 {
        terms.remove(0)
    } else {
        TypeExpr::Apply {
            head: "union".to_string(),
            args: terms,
        }
    };
    Ok((input, parsed))
}
