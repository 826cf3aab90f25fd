//! Canonical text printer
//!
//! Renders clause sets and condition trees back to query text. Output is
//! deterministic: keywords upper-case, single spaces around operators,
//! strings always double-quoted, and parentheses only where a group sits
//! inside a group of the other kind or under NOT.

use crate::{
    ClauseKind, ClauseSet, Comparison, ConditionTree, Limit, Literal, NodeId, NodeKind,
    OrderItem, PropertyRef, SelectExpr, SelectItem, Arity,
};

/// Conversion of AST nodes to canonical query text.
pub trait ToQuery {
    fn to_query(&self) -> String;
}

/// Escape a string for output inside double quotes
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            _ => result.push(c),
        }
    }
    result
}

/// Exponent form outside this magnitude range keeps the text short
const PLAIN_FLOAT_RANGE: std::ops::Range<f64> = 1e-5..1e16;

/// Render a float so it lexes back as a float: keep a decimal point or an
/// exponent, never a bare integer.
fn format_float(n: f64) -> String {
    let magnitude = n.abs();
    if n.is_finite() && n != 0.0 && !PLAIN_FLOAT_RANGE.contains(&magnitude) {
        format!("{:e}", n)
    } else if n.is_finite() && n.fract() == 0.0 {
        format!("{}.0", n)
    } else {
        n.to_string()
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

// ===== Values =====

impl ToQuery for Literal {
    fn to_query(&self) -> String {
        match self {
            Literal::Int(n) => n.to_string(),
            Literal::Float(n) => format_float(*n),
            Literal::String(s) => quote(s),
            Literal::Bool(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

impl ToQuery for PropertyRef {
    fn to_query(&self) -> String {
        if self.bracketed {
            format!("[{}]", self.source)
        } else {
            self.source.clone()
        }
    }
}

// ===== Conditions =====

impl ToQuery for Comparison {
    fn to_query(&self) -> String {
        let property = self.property.to_query();
        let values: Vec<String> = self.values.iter().map(ToQuery::to_query).collect();
        match self.op.arity() {
            Arity::Many => format!("{} {} ({})", property, self.op, values.join(", ")),
            Arity::Two => format!("{} {} {}", property, self.op, values.join(" AND ")),
            Arity::One => format!("{} {} {}", property, self.op, values.join(", ")),
        }
    }
}

impl ConditionTree {
    /// Render the condition without any clause keyword
    pub fn to_condition_string(&self) -> String {
        self.root()
            .map(|root| self.render_node(root))
            .unwrap_or_default()
    }

    fn render_node(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Compare(c) => c.to_query(),
            NodeKind::Not(child) => {
                let inner = self.render_node(*child);
                if matches!(self.kind(*child), NodeKind::Group(..)) {
                    format!("NOT ({})", inner)
                } else {
                    format!("NOT {}", inner)
                }
            }
            NodeKind::Group(kind, children) => {
                let parts: Vec<String> = children
                    .iter()
                    .map(|child| match self.kind(*child) {
                        NodeKind::Group(inner, _) if inner != kind => {
                            format!("({})", self.render_node(*child))
                        }
                        _ => self.render_node(*child),
                    })
                    .collect();
                parts.join(&format!(" {} ", kind.keyword()))
            }
        }
    }
}

impl ToQuery for ConditionTree {
    fn to_query(&self) -> String {
        self.to_condition_string()
    }
}

// ===== Clauses =====

impl ToQuery for SelectItem {
    fn to_query(&self) -> String {
        let expr = match &self.expr {
            SelectExpr::All => "*".to_string(),
            SelectExpr::Property(p) => p.to_query(),
            SelectExpr::Aggregate { function, property } => {
                format!("{}( {} )", function.name(), property.to_query())
            }
        };
        match &self.alias {
            Some(alias) => format!("{} AS {}", expr, quote(alias)),
            None => expr,
        }
    }
}

impl ToQuery for OrderItem {
    fn to_query(&self) -> String {
        match self.direction {
            Some(direction) => format!("{} {}", self.property.to_query(), direction.keyword()),
            None => self.property.to_query(),
        }
    }
}

impl ToQuery for Limit {
    fn to_query(&self) -> String {
        match self {
            Limit::Count(n) => n.to_string(),
            Limit::Infinity => "infinity".to_string(),
        }
    }
}

fn list<T: ToQuery>(items: &[T]) -> String {
    items
        .iter()
        .map(ToQuery::to_query)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ToQuery for ClauseSet {
    fn to_query(&self) -> String {
        // Clauses in canonical order, absent ones skipped
        let mut parts = Vec::new();
        if !self.select.is_empty() {
            parts.push(format!("{} {}", ClauseKind::Select.keyword(), list(&self.select)));
        }
        if let Some(tree) = self.where_clause.as_ref().filter(|t| !t.is_empty()) {
            parts.push(format!("{} {}", ClauseKind::Where.keyword(), tree.to_condition_string()));
        }
        if !self.group_by.is_empty() {
            parts.push(format!("{} {}", ClauseKind::GroupBy.keyword(), list(&self.group_by)));
        }
        if let Some(tree) = self.having.as_ref().filter(|t| !t.is_empty()) {
            parts.push(format!("{} {}", ClauseKind::Having.keyword(), tree.to_condition_string()));
        }
        if !self.order_by.is_empty() {
            parts.push(format!("{} {}", ClauseKind::OrderBy.keyword(), list(&self.order_by)));
        }
        if let Some(limit) = &self.limit {
            parts.push(format!("{} {}", ClauseKind::Limit.keyword(), limit.to_query()));
        }
        parts.join(" ")
    }
}

impl ClauseSet {
    /// Render all present clauses as a full query string
    pub fn to_query_string(&self) -> String {
        self.to_query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aggregate, ComparisonOp, GroupKind, OrderDirection, Span};
    use pretty_assertions::assert_eq;

    fn cmp(op: ComparisonOp, name: &str, values: Vec<Literal>) -> Comparison {
        Comparison::new(op, PropertyRef::new(name), values)
    }

    #[test]
    fn test_literal_to_query() {
        assert_eq!(Literal::Int(42).to_query(), "42");
        assert_eq!(Literal::Int(-7).to_query(), "-7");
        assert_eq!(Literal::Float(2.5).to_query(), "2.5");
        assert_eq!(Literal::Float(3.0).to_query(), "3.0");
        assert_eq!(Literal::Float(0.0).to_query(), "0.0");
        assert_eq!(Literal::Float(1.5e300).to_query(), "1.5e300");
        assert_eq!(Literal::Float(-2e20).to_query(), "-2e20");
        assert_eq!(Literal::Float(2.5e-7).to_query(), "2.5e-7");
        assert_eq!(Literal::Float(123456.0).to_query(), "123456.0");
        assert_eq!(Literal::String("bob".to_string()).to_query(), "\"bob\"");
        assert_eq!(Literal::Bool(false).to_query(), "false");
        assert_eq!(Literal::Null.to_query(), "null");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("hello"), "hello");
        assert_eq!(escape_string("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_string("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_comparison_shapes() {
        let in_list = cmp(ComparisonOp::NotIn, "account.id", vec!["1".into(), "2".into()]);
        assert_eq!(in_list.to_query(), "account.id NOT IN (\"1\", \"2\")");

        let between = cmp(ComparisonOp::Between, "age", vec![18.into(), 65.into()]);
        assert_eq!(between.to_query(), "age BETWEEN 18 AND 65");

        let wildcard = Comparison::new(ComparisonOp::In, PropertyRef::wildcard(), vec!["ops".into()]);
        assert_eq!(wildcard.to_query(), "$ IN (\"ops\")");

        let bracketed = cmp(ComparisonOp::SubstringI, "Display Name", vec!["kev".into()]);
        assert_eq!(bracketed.to_query(), "[Display Name] SUBSTRINGI \"kev\"");
    }

    #[test]
    fn test_parens_only_between_different_kinds() {
        let mut tree = ConditionTree::new();
        let a = tree.add_compare(cmp(ComparisonOp::Eq, "a", vec![1.into()]), Span::dummy());
        let b = tree.add_compare(cmp(ComparisonOp::Eq, "b", vec![2.into()]), Span::dummy());
        let c = tree.add_compare(cmp(ComparisonOp::Eq, "c", vec![3.into()]), Span::dummy());
        let and = tree.add_group(GroupKind::And, vec![a, b], Span::dummy());
        let or = tree.add_group(GroupKind::Or, vec![and, c], Span::dummy());
        let not = tree.add_not(or, Span::dummy());
        tree.set_root(not);
        assert_eq!(tree.to_condition_string(), "NOT ((a = 1 AND b = 2) OR c = 3)");
    }

    #[test]
    fn test_clause_order_and_spacing() {
        let clauses = ClauseSet {
            select: vec![
                SelectItem::new(SelectExpr::Property(PropertyRef::new("region"))),
                SelectItem::new(SelectExpr::Aggregate {
                    function: Aggregate::Count,
                    property: PropertyRef::new("id"),
                })
                .with_alias("total"),
            ],
            where_clause: Some(ConditionTree::from_comparison(cmp(
                ComparisonOp::Eq,
                "kevin",
                vec![true.into()],
            ))),
            group_by: vec![PropertyRef::new("region")],
            having: None,
            order_by: vec![OrderItem::new(PropertyRef::new("region"), Some(OrderDirection::Desc))],
            limit: Some(Limit::Infinity),
        };
        assert_eq!(
            clauses.to_query_string(),
            "SELECT region, COUNT( id ) AS \"total\" WHERE kevin = true GROUP BY region ORDER BY region DESC LIMIT infinity"
        );
    }

    #[test]
    fn test_empty_clause_set_renders_empty() {
        assert_eq!(ClauseSet::default().to_query_string(), "");
    }
}
