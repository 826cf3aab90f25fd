//! Parser error types

use sift_ast::{ComparisonError, Span};
use sift_lexer::TokenKind;
use thiserror::Error;

/// A lexical or syntactic problem found while parsing.
///
/// Parsing never stops at the first error; every error is collected
/// alongside the best-effort result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("unterminated bracketed property")]
    UnterminatedBracket { span: Span },

    #[error("unexpected character `{text}`")]
    UnexpectedCharacter { text: String, span: Span },

    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("missing {expected}")]
    MissingOperand { expected: String, span: Span },

    #[error("unclosed parenthesis")]
    UnclosedParen { span: Span },

    #[error("LIMIT expects a non-negative integer or `infinity`, found `{found}`")]
    InvalidLimit { found: String, span: Span },

    #[error("invalid sort direction `{found}`, expected ASC or DESC")]
    InvalidSortDirection { found: String, span: Span },

    #[error("NOT cannot be applied directly to another NOT")]
    DoubleNegation { span: Span },

    #[error("{clause} clause is out of order or repeated")]
    MisplacedClause { clause: &'static str, span: Span },

    #[error("unknown aggregate function `{name}`")]
    UnknownFunction { name: String, span: Span },

    #[error("{error}")]
    InvalidComparison { error: ComparisonError, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnterminatedString { span }
            | ParseError::UnterminatedBracket { span }
            | ParseError::UnexpectedCharacter { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::MissingOperand { span, .. }
            | ParseError::UnclosedParen { span }
            | ParseError::InvalidLimit { span, .. }
            | ParseError::InvalidSortDirection { span, .. }
            | ParseError::DoubleNegation { span }
            | ParseError::MisplacedClause { span, .. }
            | ParseError::UnknownFunction { span, .. }
            | ParseError::InvalidComparison { span, .. } => *span,
        }
    }

    /// Byte offset where the problem starts
    pub fn offset(&self) -> usize {
        self.span().start
    }

    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.describe().to_string(),
            span,
        }
    }

    pub fn missing(expected: impl Into<String>, span: Span) -> Self {
        ParseError::MissingOperand {
            expected: expected.into(),
            span,
        }
    }
}
