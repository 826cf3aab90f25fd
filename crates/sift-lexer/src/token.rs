//! Token definitions for the search query language

use logos::Logos;
use sift_ast::ComparisonOp;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
pub enum TokenKind {
    // === Clause keywords ===
    #[token("select", ignore(ascii_case))]
    Select,
    #[token("where", ignore(ascii_case))]
    Where,
    #[token("group", ignore(ascii_case))]
    Group,
    #[token("by", ignore(ascii_case))]
    By,
    #[token("having", ignore(ascii_case))]
    Having,
    #[token("order", ignore(ascii_case))]
    Order,
    #[token("limit", ignore(ascii_case))]
    Limit,
    #[token("asc", ignore(ascii_case))]
    Asc,
    #[token("desc", ignore(ascii_case))]
    Desc,
    #[token("as", ignore(ascii_case))]
    As,

    // === Logical keywords ===
    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("not", ignore(ascii_case))]
    Not,

    // === Word operators ===
    #[token("in", ignore(ascii_case))]
    In,
    #[token("between", ignore(ascii_case))]
    Between,
    #[token("contains_any", ignore(ascii_case))]
    ContainsAny,
    #[token("contains_all", ignore(ascii_case))]
    ContainsAll,
    #[token("substringi", ignore(ascii_case))]
    SubstringI,

    // === Literal keywords ===
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,
    #[token("null", ignore(ascii_case))]
    Null,

    // === Symbol operators ===
    #[token("=")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("*")]
    Star,
    #[token("$")]
    Dollar,

    // === Literals ===
    #[regex(r"-?[0-9]+", priority = 2)]
    Int,

    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"-?[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    String,

    // Missing closing quote: runs to the end of input
    #[regex(r#""([^"\\]|\\.)*"#)]
    #[regex(r#"'([^'\\]|\\.)*"#)]
    UnterminatedString,

    // === Properties ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    /// Namespaced property: `account.id`, `fake:property`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*([.:][a-zA-Z0-9_]+)+")]
    Path,

    /// Bracketed property: `[Display Name]`
    #[regex(r"\[[^\]]*\]")]
    Bracketed,

    #[regex(r"\[[^\]]*")]
    UnterminatedBracket,

    // === Special ===
    Error,
    Eof,
}

impl TokenKind {
    /// Keywords that start (or continue) a top-level clause
    pub fn is_clause_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Select
                | TokenKind::Where
                | TokenKind::Group
                | TokenKind::By
                | TokenKind::Having
                | TokenKind::Order
                | TokenKind::Limit
        )
    }

    /// Tokens that can open a clause
    pub fn starts_clause(&self) -> bool {
        matches!(
            self,
            TokenKind::Select
                | TokenKind::Where
                | TokenKind::Group
                | TokenKind::Having
                | TokenKind::Order
                | TokenKind::Limit
        )
    }

    pub fn is_property(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident | TokenKind::Path | TokenKind::Bracketed | TokenKind::Dollar
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// `AND`, `OR`, `&&`, `||` and the context-dependent comma
    pub fn is_connector(&self) -> bool {
        matches!(
            self,
            TokenKind::And | TokenKind::Or | TokenKind::AndAnd | TokenKind::OrOr | TokenKind::Comma
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TokenKind::Error | TokenKind::UnterminatedString | TokenKind::UnterminatedBracket
        )
    }

    /// Single-token comparison operator (`NOT IN` is assembled by the parser)
    pub fn comparison_op(&self) -> Option<ComparisonOp> {
        let op = match self {
            TokenKind::Eq => ComparisonOp::Eq,
            TokenKind::Ne => ComparisonOp::Ne,
            TokenKind::Lt => ComparisonOp::Lt,
            TokenKind::Le => ComparisonOp::Le,
            TokenKind::Gt => ComparisonOp::Gt,
            TokenKind::Ge => ComparisonOp::Ge,
            TokenKind::In => ComparisonOp::In,
            TokenKind::Between => ComparisonOp::Between,
            TokenKind::ContainsAny => ComparisonOp::ContainsAny,
            TokenKind::ContainsAll => ComparisonOp::ContainsAll,
            TokenKind::SubstringI => ComparisonOp::SubstringI,
            _ => return None,
        };
        Some(op)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Select => "'SELECT'",
            TokenKind::Where => "'WHERE'",
            TokenKind::Group => "'GROUP'",
            TokenKind::By => "'BY'",
            TokenKind::Having => "'HAVING'",
            TokenKind::Order => "'ORDER'",
            TokenKind::Limit => "'LIMIT'",
            TokenKind::Asc => "'ASC'",
            TokenKind::Desc => "'DESC'",
            TokenKind::As => "'AS'",
            TokenKind::And => "'AND'",
            TokenKind::Or => "'OR'",
            TokenKind::Not => "'NOT'",
            TokenKind::In => "'IN'",
            TokenKind::Between => "'BETWEEN'",
            TokenKind::ContainsAny => "'CONTAINS_ANY'",
            TokenKind::ContainsAll => "'CONTAINS_ALL'",
            TokenKind::SubstringI => "'SUBSTRINGI'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::Eq => "'='",
            TokenKind::Ne => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Star => "'*'",
            TokenKind::Dollar => "'$'",
            TokenKind::Int => "integer",
            TokenKind::Float => "number",
            TokenKind::String => "string",
            TokenKind::UnterminatedString => "unterminated string",
            TokenKind::Ident => "identifier",
            TokenKind::Path => "property path",
            TokenKind::Bracketed => "bracketed property",
            TokenKind::UnterminatedBracket => "unterminated bracketed property",
            TokenKind::Error => "error",
            TokenKind::Eof => "end of input",
        }
    }
}
