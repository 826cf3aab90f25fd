//! Clause-level AST nodes

use serde::Serialize;

use crate::{ConditionTree, PropertyRef, Span};

/// A full parsed query: every clause is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseSet {
    pub select: Vec<SelectItem>,
    pub where_clause: Option<ConditionTree>,
    pub group_by: Vec<PropertyRef>,
    /// Only meaningful together with `group_by`; not enforced here
    pub having: Option<ConditionTree>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Limit>,
}

impl ClauseSet {
    pub fn is_empty(&self) -> bool {
        self.select.is_empty()
            && self.where_clause.is_none()
            && self.group_by.is_empty()
            && self.having.is_none()
            && self.order_by.is_empty()
            && self.limit.is_none()
    }
}

/// The top-level clauses, in canonical output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
}

impl ClauseKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClauseKind::Select => "SELECT",
            ClauseKind::Where => "WHERE",
            ClauseKind::GroupBy => "GROUP BY",
            ClauseKind::Having => "HAVING",
            ClauseKind::OrderBy => "ORDER BY",
            ClauseKind::Limit => "LIMIT",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            ClauseKind::Select => "select",
            ClauseKind::Where => "where",
            ClauseKind::GroupBy => "group_by",
            ClauseKind::Having => "having",
            ClauseKind::OrderBy => "order_by",
            ClauseKind::Limit => "limit",
        }
    }
}

/// Aggregate functions allowed in a select list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Count,
    UCount,
    Min,
    Max,
    Avg,
}

impl Aggregate {
    pub const ALL: [Aggregate; 5] = [
        Aggregate::Count,
        Aggregate::UCount,
        Aggregate::Min,
        Aggregate::Max,
        Aggregate::Avg,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::UCount => "UCOUNT",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Avg => "AVG",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::UCount => "ucount",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Avg => "avg",
        }
    }

    /// Case-insensitive lookup by function name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

/// SELECT list entry
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: SelectExpr,
    pub alias: Option<String>,
    pub span: Span,
}

impl SelectItem {
    pub fn new(expr: SelectExpr) -> Self {
        Self {
            expr,
            alias: None,
            span: Span::dummy(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl PartialEq for SelectItem {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr && self.alias == other.alias
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    /// SELECT *
    All,
    Property(PropertyRef),
    Aggregate {
        function: Aggregate,
        property: PropertyRef,
    },
}

/// ORDER BY item. The direction is kept as written.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub property: PropertyRef,
    pub direction: Option<OrderDirection>,
    pub span: Span,
}

impl OrderItem {
    pub fn new(property: PropertyRef, direction: Option<OrderDirection>) -> Self {
        Self {
            property,
            direction,
            span: Span::dummy(),
        }
    }
}

impl PartialEq for OrderItem {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property && self.direction == other.direction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Infinity,
}
