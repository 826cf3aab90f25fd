//! Sift Parser - Recursive descent parser
//!
//! Parses query text into a [`ClauseSet`]. Parsing is error tolerant:
//! every problem is collected as a [`ParseError`] and the clauses that did
//! parse are kept, which is what editor tooling needs for half-typed input.
//!
//! Conditions come out normalized, so two spellings of the same condition
//! produce equal trees:
//! - AND binds tighter than OR
//! - a comma means the nearest explicit connector on its level, or AND
//! - redundant parentheses and nested same-kind groups are flattened

mod error;
mod parser;

pub use error::*;
pub use parser::*;

use sift_ast::{ClauseKind, ClauseSet, ConditionTree, Span};
use sift_lexer::{tokenize, Token};
use tracing::debug;

/// Result of parsing one query string
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub source: String,
    /// Every token, error tokens included, ending with `Eof`
    pub tokens: Vec<Token>,
    pub clauses: ClauseSet,
    /// Span of each clause as written, in source order
    pub clause_spans: Vec<(ClauseKind, Span)>,
    pub errors: Vec<ParseError>,
}

impl ParsedQuery {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The WHERE condition (or the whole condition of a fragment)
    pub fn condition(&self) -> Option<&ConditionTree> {
        self.clauses.where_clause.as_ref()
    }

    pub fn into_result(self) -> Result<ClauseSet, Vec<ParseError>> {
        if self.errors.is_empty() {
            Ok(self.clauses)
        } else {
            Err(self.errors)
        }
    }

    /// The clause an offset falls in: the last clause starting at or before
    /// it, else the first clause.
    pub fn clause_at(&self, offset: usize) -> Option<(ClauseKind, Span)> {
        self.clause_spans
            .iter()
            .rev()
            .find(|(_, span)| span.start <= offset)
            .or_else(|| self.clause_spans.first())
            .copied()
    }
}

/// Parse a full query: any subset of SELECT, WHERE, GROUP BY, HAVING,
/// ORDER BY and LIMIT, in that order.
pub fn parse(source: &str) -> ParsedQuery {
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, &tokens);
    let clauses = parser.parse_query();
    let (errors, clause_spans) = parser.finish();
    debug!(
        clauses = clause_spans.len(),
        errors = errors.len(),
        "parsed query"
    );

    ParsedQuery {
        source: source.to_string(),
        tokens,
        clauses,
        clause_spans,
        errors,
    }
}

/// Parse a bare condition such as `kevin = true, age > 3`. The result is
/// stored as the WHERE clause.
pub fn parse_condition_fragment(source: &str) -> ParsedQuery {
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, &tokens);
    let where_clause = parser.parse_fragment();
    let (errors, clause_spans) = parser.finish();
    debug!(errors = errors.len(), "parsed condition fragment");

    ParsedQuery {
        source: source.to_string(),
        tokens,
        clauses: ClauseSet {
            where_clause,
            ..ClauseSet::default()
        },
        clause_spans,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sift_ast::{
        Aggregate, ComparisonError, ComparisonOp, Limit, Literal, NodeKind, OrderDirection,
        SelectExpr,
    };

    fn canonical(source: &str) -> String {
        let parsed = parse(source);
        assert!(parsed.is_ok(), "errors parsing {source:?}: {:?}", parsed.errors);
        parsed.clauses.to_query_string()
    }

    fn first_error(source: &str) -> ParseError {
        let parsed = parse(source);
        assert!(parsed.has_errors(), "expected errors parsing {source:?}");
        parsed.errors[0].clone()
    }

    #[test]
    fn test_parse_full_query() {
        let parsed = parse(
            "SELECT [Property1], Property2, MIN( [Property4] ) AS \"MinAlias\" \
             WHERE kevin = true GROUP BY Property2 HAVING Property2 > 3 \
             ORDER BY Property2 DESC LIMIT 50",
        );
        assert!(parsed.is_ok(), "{:?}", parsed.errors);

        let clauses = &parsed.clauses;
        assert_eq!(clauses.select.len(), 3);
        assert!(matches!(&clauses.select[0].expr, SelectExpr::Property(p) if p.bracketed));
        assert!(matches!(
            &clauses.select[2].expr,
            SelectExpr::Aggregate { function: Aggregate::Min, property } if property.source == "Property4"
        ));
        assert_eq!(clauses.select[2].alias.as_deref(), Some("MinAlias"));
        assert!(clauses.where_clause.is_some());
        assert_eq!(clauses.group_by.len(), 1);
        assert!(clauses.having.is_some());
        assert_eq!(clauses.order_by[0].direction, Some(OrderDirection::Desc));
        assert_eq!(clauses.limit, Some(Limit::Count(50)));
    }

    #[test]
    fn test_canonical_rewrites() {
        assert_eq!(canonical("select * where kevin=true"), "SELECT * WHERE kevin = true");
        assert_eq!(canonical("where name = bob"), "WHERE name = \"bob\"");
        assert_eq!(canonical("where name = 'bob'"), "WHERE name = \"bob\"");
        assert_eq!(canonical("where x in 1"), "WHERE x IN (1)");
        assert_eq!(canonical("WHERE ((a = 1))"), "WHERE a = 1");
        assert_eq!(canonical("order by a desc, b"), "ORDER BY a DESC, b");
        assert_eq!(canonical("limit INFINITY"), "LIMIT infinity");
        assert_eq!(
            canonical("where a between 1 and 5 and b = 2"),
            "WHERE a BETWEEN 1 AND 5 AND b = 2"
        );
        assert_eq!(
            canonical("where account.id not in (\"1\", \"2\")"),
            "WHERE account.id NOT IN (\"1\", \"2\")"
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            canonical("WHERE a = 1 OR b = 2 AND c = 3"),
            "WHERE a = 1 OR (b = 2 AND c = 3)"
        );
        assert_eq!(
            canonical("WHERE a = 1 || b = 2 && c = 3"),
            "WHERE a = 1 OR (b = 2 AND c = 3)"
        );
    }

    #[test]
    fn test_comma_takes_nearest_connector() {
        assert_eq!(canonical("WHERE a = 1, b = 2"), "WHERE a = 1 AND b = 2");
        assert_eq!(
            canonical("WHERE a = 1, b = 2 OR c = 3"),
            "WHERE a = 1 OR b = 2 OR c = 3"
        );
        assert_eq!(
            canonical("WHERE a = 1 AND b = 2 OR c = 3, d = 4"),
            "WHERE (a = 1 AND b = 2) OR c = 3 OR d = 4"
        );
        // Commas inside parentheses look only at their own level
        assert_eq!(
            canonical("WHERE (a = 1, b = 2) OR c = 3"),
            "WHERE (a = 1 AND b = 2) OR c = 3"
        );
    }

    #[test]
    fn test_nested_groups_flatten() {
        assert_eq!(
            canonical("WHERE (a = 1 AND b = 2) AND c = 3"),
            "WHERE a = 1 AND b = 2 AND c = 3"
        );
        assert_eq!(
            canonical("WHERE NOT (a = 1 OR (b = 2 OR c = 3))"),
            "WHERE NOT (a = 1 OR b = 2 OR c = 3)"
        );
    }

    #[test]
    fn test_values() {
        let parsed = parse("WHERE a IN (1, 2.5, \"x\\\"y\", true, null, bare)");
        assert!(parsed.is_ok(), "{:?}", parsed.errors);
        let tree = parsed.condition().unwrap();
        let (_, comparison) = tree.comparisons().next().unwrap();
        assert_eq!(comparison.op, ComparisonOp::In);
        assert_eq!(
            comparison.values,
            vec![
                Literal::Int(1),
                Literal::Float(2.5),
                Literal::String("x\"y".to_string()),
                Literal::Bool(true),
                Literal::Null,
                Literal::String("bare".to_string()),
            ]
        );
    }

    #[test]
    fn test_integer_overflow_becomes_float() {
        let parsed = parse("WHERE a > 99999999999999999999");
        let (_, comparison) = parsed.condition().unwrap().comparisons().next().unwrap();
        assert!(matches!(comparison.values[0], Literal::Float(_)));
        assert_eq!(canonical("WHERE a > 99999999999999999999"), "WHERE a > 1e20");
        assert_eq!(canonical("WHERE a > 1e20"), "WHERE a > 1e20");
    }

    #[test]
    fn test_wildcard_property() {
        assert_eq!(canonical("WHERE $ IN (\"ops\")"), "WHERE $ IN (\"ops\")");
        assert_eq!(
            first_error("WHERE $ = 1"),
            ParseError::InvalidComparison {
                error: ComparisonError::WildcardOperator { op: ComparisonOp::Eq },
                span: Span::new(6, 11),
            }
        );
    }

    #[test]
    fn test_missing_condition() {
        assert_eq!(
            first_error("SELECT * WHERE"),
            ParseError::MissingOperand {
                expected: "a condition".to_string(),
                span: Span::new(14, 14),
            }
        );
    }

    #[test]
    fn test_invalid_limits() {
        assert!(matches!(
            first_error("LIMIT -20"),
            ParseError::InvalidLimit { found, .. } if found == "-20"
        ));
        assert!(matches!(
            first_error("LIMIT fifty"),
            ParseError::InvalidLimit { found, .. } if found == "fifty"
        ));
        assert!(matches!(first_error("LIMIT 2.5"), ParseError::InvalidLimit { .. }));
    }

    #[test]
    fn test_double_negation_rejected() {
        assert!(matches!(
            first_error("WHERE NOT NOT a = true"),
            ParseError::DoubleNegation { span } if span.start == 6
        ));
        // Parentheses do not hide the inner NOT
        assert!(matches!(
            first_error("WHERE NOT (NOT a = true)"),
            ParseError::DoubleNegation { .. }
        ));
    }

    #[test]
    fn test_invalid_sort_direction() {
        let parsed = parse("ORDER BY fake:property NONSENSE");
        assert_eq!(
            parsed.errors,
            vec![ParseError::InvalidSortDirection {
                found: "NONSENSE".to_string(),
                span: Span::new(23, 31),
            }]
        );
        assert_eq!(parsed.clauses.order_by.len(), 1);
        assert_eq!(parsed.clauses.order_by[0].property.source, "fake:property");
    }

    #[test]
    fn test_clause_order_enforced() {
        assert_eq!(
            first_error("WHERE a = 1 SELECT *"),
            ParseError::MisplacedClause {
                clause: "SELECT",
                span: Span::new(12, 18),
            }
        );
        assert!(matches!(
            first_error("LIMIT 1 LIMIT 2"),
            ParseError::MisplacedClause { clause: "LIMIT", .. }
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(
            first_error("SELECT MEDIAN( a )"),
            ParseError::UnknownFunction { name, .. } if name == "MEDIAN"
        ));
    }

    #[test]
    fn test_unclosed_paren() {
        assert!(matches!(
            first_error("WHERE a IN (1, 2"),
            ParseError::UnclosedParen { span } if span.start == 11
        ));
        assert!(matches!(
            first_error("WHERE (a = 1"),
            ParseError::UnclosedParen { span } if span.start == 6
        ));
    }

    #[test]
    fn test_lexical_errors_reported() {
        assert!(matches!(
            first_error("WHERE a = \"open"),
            ParseError::UnterminatedString { span } if span == Span::new(10, 15)
        ));
        assert!(matches!(
            first_error("WHERE a # 1"),
            ParseError::UnexpectedCharacter { text, .. } if text == "#"
        ));
    }

    #[test]
    fn test_partial_result_kept() {
        let parsed = parse("SELECT a WHERE b = LIMIT 5");
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(&parsed.errors[0], ParseError::MissingOperand { expected, .. } if expected == "a value"));
        assert_eq!(parsed.clauses.select.len(), 1);
        assert!(parsed.clauses.where_clause.is_none());
        assert_eq!(parsed.clauses.limit, Some(Limit::Count(5)));
    }

    #[test]
    fn test_failed_term_dropped_from_group() {
        let parsed = parse("WHERE a = 1 AND b = AND c = 3");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(
            parsed.condition().unwrap().to_condition_string(),
            "a = 1 AND c = 3"
        );
    }

    #[test]
    fn test_clause_spans() {
        let parsed = parse("SELECT a WHERE b = 1");
        assert_eq!(
            parsed.clause_spans,
            vec![
                (ClauseKind::Select, Span::new(0, 8)),
                (ClauseKind::Where, Span::new(9, 20)),
            ]
        );
        assert_eq!(parsed.clause_at(3).map(|(k, _)| k), Some(ClauseKind::Select));
        assert_eq!(parsed.clause_at(8).map(|(k, _)| k), Some(ClauseKind::Select));
        assert_eq!(parsed.clause_at(15).map(|(k, _)| k), Some(ClauseKind::Where));
    }

    #[test]
    fn test_parent_links_after_parse() {
        let parsed = parse("WHERE NOT (a = 1 OR b = 2)");
        let tree = parsed.condition().unwrap();
        let root = tree.root().unwrap();
        assert!(matches!(tree.kind(root), NodeKind::Not(_)));
        let (leaf, _) = tree.comparisons().next().unwrap();
        assert_eq!(tree.ancestors(leaf).last(), Some(root));
    }

    #[test]
    fn test_condition_fragment() {
        let parsed = parse_condition_fragment("kevin = true, x > 2");
        assert!(parsed.is_ok(), "{:?}", parsed.errors);
        assert_eq!(
            parsed.condition().unwrap().to_condition_string(),
            "kevin = true AND x > 2"
        );
        assert_eq!(parsed.clause_spans, vec![(ClauseKind::Where, Span::new(0, 19))]);

        let empty = parse_condition_fragment("   ");
        assert!(empty.is_ok());
        assert!(empty.condition().is_none());

        assert!(parse_condition_fragment("a = 1 LIMIT 3").has_errors());
    }

    #[test]
    fn test_empty_query() {
        let parsed = parse("");
        assert!(parsed.is_ok());
        assert!(parsed.clauses.is_empty());
    }
}
