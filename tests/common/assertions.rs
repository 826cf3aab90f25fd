use sift_ast::ClauseSet;
use sift_parser::{parse, parse_condition_fragment, ParseError};

/// Assert that parsing succeeds and return the clauses
pub fn assert_parses(source: &str) -> ClauseSet {
    let parsed = parse(source);
    assert!(
        parsed.is_ok(),
        "Expected {:?} to parse, got errors: {:?}",
        source,
        parsed.errors
    );
    parsed.clauses
}

/// Assert that parsing reports at least one error and return them
pub fn assert_parse_fails(source: &str) -> Vec<ParseError> {
    let parsed = parse(source);
    assert!(
        parsed.has_errors(),
        "Expected {:?} to fail parsing, got {:?}",
        source,
        parsed.clauses.to_query_string()
    );
    parsed.errors
}

/// Canonical text of a full query
pub fn canonical(source: &str) -> String {
    assert_parses(source).to_query_string()
}

/// Canonical text of a bare condition
pub fn canonical_fragment(source: &str) -> String {
    let parsed = parse_condition_fragment(source);
    assert!(
        parsed.is_ok(),
        "Expected fragment {:?} to parse, got errors: {:?}",
        source,
        parsed.errors
    );
    parsed
        .condition()
        .map(|tree| tree.to_condition_string())
        .unwrap_or_default()
}
