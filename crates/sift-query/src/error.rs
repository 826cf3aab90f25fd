//! Errors from the query facade and the condition builder

use sift_ast::{ComparisonError, JsonError};
use sift_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{}", describe_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Json(#[from] JsonError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error("NOT cannot be applied directly to another NOT")]
    DoubleNegation,

    #[error("NOT must be followed by a condition or group")]
    DanglingNegation,

    #[error("property `{name}` has {count} distinct conditions; use get_property_conditions")]
    AmbiguousProperty { name: String, count: usize },
}

fn describe_parse_errors(errors: &[ParseError]) -> String {
    match errors {
        [] => "query could not be parsed".to_string(),
        [only] => format!("{} at offset {}", only, only.offset()),
        [first, rest @ ..] => format!(
            "{} at offset {} (and {} more)",
            first,
            first.offset(),
            rest.len()
        ),
    }
}
