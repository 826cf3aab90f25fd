//! Cursor inspection for interactive query editors
//!
//! Maps a caret offset in the query text to the phrase under it, the role
//! that phrase plays, and the clause that contains it. Works on parses with
//! errors, using whatever the parser managed to keep.

use serde::Serialize;
use sift_ast::{ClauseKind, ComparisonOp, ConditionTree, NodeId, NodeKind, SelectExpr, Span};
use sift_lexer::{Token, TokenKind};
use sift_parser::ParsedQuery;
use tracing::trace;

/// Role of the phrase under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseType {
    Property,
    Operator,
    Value,
}

impl PhraseType {
    pub fn as_str(self) -> &'static str {
        match self {
            PhraseType::Property => "property",
            PhraseType::Operator => "operator",
            PhraseType::Value => "value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorDetails {
    /// Exact source text of the phrase
    pub phrase: String,
    pub inferred_type: PhraseType,
    pub top_clause_type: ClauseKind,
    pub span: Span,
}

impl CursorDetails {
    /// Inspect `parsed` at byte `offset`. Returns `None` for input with no
    /// tokens or no recognizable clause.
    pub fn from_parser(parsed: &ParsedQuery, offset: usize) -> Option<CursorDetails> {
        let index = token_at(&parsed.tokens, offset)?;
        let token = parsed.tokens[index];
        let (clause, clause_span) = parsed.clause_at(token.span.start)?;

        let (span, inferred_type) = if token.kind.is_clause_keyword() {
            (clause_span, PhraseType::Operator)
        } else {
            match clause {
                ClauseKind::Select => select_phrase(parsed, token),
                ClauseKind::Where => condition_phrase(parsed, parsed.clauses.where_clause.as_ref(), index),
                ClauseKind::Having => condition_phrase(parsed, parsed.clauses.having.as_ref(), index),
                ClauseKind::GroupBy | ClauseKind::OrderBy if token.kind.is_property() => {
                    (token.span, PhraseType::Property)
                }
                ClauseKind::OrderBy if matches!(token.kind, TokenKind::Asc | TokenKind::Desc) => {
                    (token.span, PhraseType::Operator)
                }
                ClauseKind::Limit if token.kind != TokenKind::Comma => (token.span, PhraseType::Value),
                _ => (clause_span, PhraseType::Operator),
            }
        };
        let span = span_or(span, clause_span);

        trace!(offset, start = span.start, end = span.end, ?inferred_type, "cursor resolved");
        Some(CursorDetails {
            phrase: span.slice(&parsed.source).to_string(),
            inferred_type,
            top_clause_type: clause,
            span,
        })
    }
}

/// Index of the token under `offset`. On whitespace, a token ending exactly
/// at the offset wins; otherwise the nearest token.
fn token_at(tokens: &[Token], offset: usize) -> Option<usize> {
    let candidates = || {
        tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind != TokenKind::Eof)
    };

    candidates()
        .find(|(_, t)| t.span.contains(offset))
        .or_else(|| candidates().filter(|(_, t)| t.span.end == offset).last())
        .or_else(|| {
            candidates().min_by_key(|(_, t)| {
                if offset < t.span.start {
                    t.span.start - offset
                } else {
                    offset.saturating_sub(t.span.end)
                }
            })
        })
        .map(|(i, _)| i)
}

fn span_or(span: Span, fallback: Span) -> Span {
    if span.is_dummy() {
        fallback
    } else {
        span
    }
}

fn select_phrase(parsed: &ParsedQuery, token: Token) -> (Span, PhraseType) {
    let item = parsed
        .clauses
        .select
        .iter()
        .find(|item| item.span.contains(token.span.start));

    match item.map(|item| (item, &item.expr)) {
        // Anywhere inside an aggregate the phrase is the whole item
        Some((item, SelectExpr::Aggregate { property, .. })) => {
            let role = if token.span == property.span {
                PhraseType::Property
            } else if token.kind == TokenKind::String {
                PhraseType::Value
            } else {
                PhraseType::Operator
            };
            (item.span, role)
        }
        Some((_, SelectExpr::Property(property))) if token.span == property.span => {
            (token.span, PhraseType::Property)
        }
        Some((_, SelectExpr::All)) if token.kind == TokenKind::Star => {
            (token.span, PhraseType::Property)
        }
        Some(_) => match token.kind {
            TokenKind::As => (token.span, PhraseType::Operator),
            // Alias
            TokenKind::String | TokenKind::Ident | TokenKind::Path => (token.span, PhraseType::Value),
            _ => (Span::dummy(), PhraseType::Operator),
        },
        None if token.kind.is_property() => (token.span, PhraseType::Property),
        None => (Span::dummy(), PhraseType::Operator),
    }
}

fn condition_phrase(
    parsed: &ParsedQuery,
    tree: Option<&ConditionTree>,
    index: usize,
) -> (Span, PhraseType) {
    let token = parsed.tokens[index];
    let deepest = tree.and_then(|tree| deepest_node(tree, token.span.start).map(|id| (tree, id)));

    let Some((tree, id)) = deepest else {
        // Nothing parsed here; classify the bare token
        return match token.kind {
            kind if kind.is_property() => (token.span, PhraseType::Property),
            kind if kind.is_literal() => (token.span, PhraseType::Value),
            kind if kind.comparison_op().is_some() => (token.span, PhraseType::Operator),
            _ => (Span::dummy(), PhraseType::Operator),
        };
    };

    match tree.kind(id) {
        NodeKind::Compare(comparison) => {
            if token.kind.is_property() && token.span == comparison.property.span {
                return (token.span, PhraseType::Property);
            }
            match token.kind {
                TokenKind::Not | TokenKind::In if comparison.op == ComparisonOp::NotIn => {
                    (not_in_span(&parsed.tokens, index), PhraseType::Operator)
                }
                kind if kind.comparison_op().is_some() => (token.span, PhraseType::Operator),
                // The AND between BETWEEN bounds
                TokenKind::And => (token.span, PhraseType::Operator),
                kind if kind.is_literal() || kind.is_property() => (token.span, PhraseType::Value),
                _ => (tree.span(id), PhraseType::Value),
            }
        }
        // NOT, connectors and parentheses cover the enclosing node; walk up
        // to the outermost NOT so `NOT (...)` is reported as one phrase
        NodeKind::Not(_) | NodeKind::Group(..) => {
            let outer = tree
                .ancestors(id)
                .take_while(|parent| matches!(tree.kind(*parent), NodeKind::Not(_)))
                .last()
                .unwrap_or(id);
            (tree.span(outer), PhraseType::Operator)
        }
    }
}

/// Deepest reachable node whose span contains `offset`
fn deepest_node(tree: &ConditionTree, offset: usize) -> Option<NodeId> {
    tree.preorder()
        .into_iter()
        .filter(|id| tree.span(*id).contains(offset))
        .last()
}

/// `NOT IN` as one operator phrase
fn not_in_span(tokens: &[Token], index: usize) -> Span {
    let token = tokens[index];
    let partner = match token.kind {
        TokenKind::Not => tokens.get(index + 1),
        _ => index.checked_sub(1).and_then(|i| tokens.get(i)),
    };
    match partner {
        Some(other) => token.span.merge(other.span),
        None => token.span,
    }
}
