//! Cursor inspection on full queries

use pretty_assertions::assert_eq;
use sift_ast::ClauseKind;
use sift_parser::parse;
use sift_query::{CursorDetails, PhraseType};

const QUERY: &str =
    "SELECT [Property1], Property2, arbitrary.json.property, MIN( [Property4] ) AS \"MinPropertyAlias\"";

fn at(source: &str, offset: usize) -> CursorDetails {
    CursorDetails::from_parser(&parse(source), offset)
        .unwrap_or_else(|| panic!("nothing at offset {} of {:?}", offset, source))
}

#[test]
fn cursor_inside_bracketed_property() {
    let details = at(QUERY, 7);
    assert_eq!(details.phrase, "[Property1]");
    assert_eq!(details.inferred_type, PhraseType::Property);
    assert_eq!(details.top_clause_type, ClauseKind::Select);
}

#[test]
fn cursor_on_clause_keyword() {
    let details = at(QUERY, 0);
    assert_eq!(details.phrase, QUERY);
    assert_eq!(details.inferred_type, PhraseType::Operator);
    assert_eq!(details.top_clause_type, ClauseKind::Select);
}

#[test]
fn phrases_are_exact_substrings() {
    let source = "SELECT a WHERE b IN (1, 2) AND NOT c = \"x\" ORDER BY a DESC LIMIT 10";
    for offset in 0..=source.len() {
        let details = at(source, offset);
        assert_eq!(
            &source[details.span.start..details.span.end],
            details.phrase,
            "offset {}",
            offset
        );
        assert!(!details.phrase.is_empty(), "offset {}", offset);
    }
}

#[test]
fn clause_types_follow_offsets() {
    let source = "SELECT a WHERE b = 1 GROUP BY a HAVING a > 2 ORDER BY a LIMIT 10";
    let clause = |needle: &str| at(source, source.find(needle).unwrap()).top_clause_type;

    assert_eq!(clause("b = 1"), ClauseKind::Where);
    assert_eq!(clause("GROUP"), ClauseKind::GroupBy);
    assert_eq!(clause("a > 2"), ClauseKind::Having);
    assert_eq!(clause("ORDER"), ClauseKind::OrderBy);
    assert_eq!(clause("10"), ClauseKind::Limit);
}

#[test]
fn cursor_json_form() {
    let details = at(QUERY, 7);
    assert_eq!(
        serde_json::to_value(&details).unwrap(),
        serde_json::json!({
            "phrase": "[Property1]",
            "inferred_type": "property",
            "top_clause_type": "select",
            "span": { "start": 7, "end": 18 }
        })
    );
}
