//! Validation and JSON decoding errors

use thiserror::Error;

use crate::ComparisonOp;

/// A comparison whose shape does not fit its operator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparisonError {
    #[error("the `$` wildcard can only be used with IN, NOT IN, CONTAINS_ANY or CONTAINS_ALL, not {op}")]
    WildcardOperator { op: ComparisonOp },

    #[error("{op} expects {expected}, found {found} value(s)")]
    Arity {
        op: ComparisonOp,
        expected: &'static str,
        found: usize,
    },

    #[error("property name `{name}` cannot contain `]`")]
    InvalidProperty { name: String },
}

/// A JSON tree that does not decode to a query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JsonError {
    #[error("expected {expected}, found {found}")]
    UnexpectedShape { expected: &'static str, found: String },

    #[error("unknown operator `{key}`")]
    UnknownOperator { key: String },

    #[error("unknown clause `{key}`")]
    UnknownClause { key: String },

    #[error("unknown aggregate function `{name}`")]
    UnknownFunction { name: String },

    #[error("logical group `{key}` has no conditions")]
    EmptyGroup { key: String },

    #[error("NOT cannot be applied directly to another NOT")]
    DoubleNegation,

    #[error("property name `{name}` cannot contain `]`")]
    InvalidProperty { name: String },

    #[error("invalid limit: {found}")]
    InvalidLimit { found: String },

    #[error("invalid sort direction `{found}`")]
    InvalidDirection { found: String },

    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

impl JsonError {
    pub(crate) fn shape(expected: &'static str, found: &serde_json::Value) -> Self {
        let mut found = found.to_string();
        if found.len() > 60 {
            let mut cut = 57;
            while !found.is_char_boundary(cut) {
                cut -= 1;
            }
            found.truncate(cut);
            found.push_str("...");
        }
        JsonError::UnexpectedShape { expected, found }
    }
}
