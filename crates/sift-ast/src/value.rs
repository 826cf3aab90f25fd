//! Literal values and property references

use serde::Serialize;

use crate::Span;

/// Name of the wildcard pseudo-property (`$`)
pub const WILDCARD: &str = "$";

/// Words the lexer reserves; a property with one of these names must be
/// written in brackets.
pub const RESERVED_WORDS: &[&str] = &[
    "select",
    "where",
    "group",
    "by",
    "having",
    "order",
    "asc",
    "desc",
    "limit",
    "as",
    "and",
    "or",
    "not",
    "in",
    "between",
    "contains_any",
    "contains_all",
    "substringi",
    "true",
    "false",
    "null",
];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
}

/// A reference to a queryable field.
///
/// Equality is by name only: `[Property1]` and `Property1` name the same
/// field. `bracketed` and `span` only influence rendering and cursor lookup.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyRef {
    pub source: String,
    #[serde(skip)]
    pub bracketed: bool,
    #[serde(skip)]
    pub span: Span,
}

impl PropertyRef {
    /// A property created outside the parser; brackets are added only when
    /// the name could not be lexed as a bare property.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let bracketed = needs_brackets(&source);
        Self {
            source,
            bracketed,
            span: Span::dummy(),
        }
    }

    pub fn wildcard() -> Self {
        Self::new(WILDCARD)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_brackets(mut self) -> Self {
        self.bracketed = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.source
    }

    pub fn is_wildcard(&self) -> bool {
        self.source == WILDCARD
    }
}

impl PartialEq for PropertyRef {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PropertyRef {}

/// Whether `name` can be written as query text at all. Bracketed names end
/// at the first `]`, so a name containing one cannot be read back.
pub fn is_representable(name: &str) -> bool {
    !name.contains(']')
}

/// Whether `name` has to be bracketed to survive a text round-trip
pub fn needs_brackets(name: &str) -> bool {
    name != WILDCARD && (!is_plain_path(name) || is_reserved_word(name))
}

/// `ident` or `ident(.|:)segment...`, matching the lexer's property tokens
fn is_plain_path(name: &str) -> bool {
    let mut segments = name.split(['.', ':']);
    let Some(head) = segments.next() else {
        return false;
    };
    let head_ok = head
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && head.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    head_ok && segments.all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// A literal value on the right-hand side of a comparison.
///
/// Barewords in query text (`kevin = bob`) become `String` literals; the
/// promotion is one-way and they always render quoted.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<&String> for Literal {
    fn from(value: &String) -> Self {
        Literal::String(value.clone())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Literal::Null)
    }
}
