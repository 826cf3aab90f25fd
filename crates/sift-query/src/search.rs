//! The `SearchQuery` facade

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use sift_ast::{ClauseSet, ConditionTree, Limit, OrderItem, PropertyRef, SelectItem};
use sift_parser::{parse, ParseError};
use tracing::debug;

use crate::{ConditionBuilder, PropertyCondition, QueryError};

/// One query: the unit of parsing, equality and serialization.
///
/// Equality is structural over the canonical clause set, so queries that
/// differ only in spelling (`&&` vs `AND`, bare vs quoted strings, extra
/// parentheses) compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    clauses: ClauseSet,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clauses(clauses: ClauseSet) -> Self {
        Self { clauses }
    }

    /// Parse query text, rejecting it if there is any error
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        parse(text)
            .into_result()
            .map(Self::from_clauses)
            .map_err(QueryError::Parse)
    }

    /// Parse query text, keeping whatever parsed alongside the errors
    pub fn parse_lenient(text: &str) -> (Self, Vec<ParseError>) {
        let parsed = parse(text);
        (Self::from_clauses(parsed.clauses), parsed.errors)
    }

    /// Decode a full clause-set JSON object
    pub fn from_json(value: &Value) -> Result<Self, QueryError> {
        let clauses = ClauseSet::from_json(value)?;
        debug!(clauses = value.as_object().map_or(0, |m| m.len()), "decoded query json");
        Ok(Self::from_clauses(clauses))
    }

    /// Decode a bare condition tree as the WHERE clause
    pub fn from_json_fragment(value: &Value) -> Result<Self, QueryError> {
        let mut query = Self::new();
        if !value.is_null() {
            let tree = ConditionTree::from_json(value)?;
            query.set_where(Some(tree))?;
        }
        Ok(query)
    }

    pub fn clauses(&self) -> &ClauseSet {
        &self.clauses
    }

    pub fn into_clauses(self) -> ClauseSet {
        self.clauses
    }

    /// The WHERE condition
    pub fn condition(&self) -> Option<&ConditionTree> {
        self.clauses.where_clause.as_ref()
    }

    pub fn to_query_string(&self) -> String {
        self.clauses.to_query_string()
    }

    /// The WHERE condition without its keyword; empty if there is none
    pub fn to_condition_string(&self) -> String {
        self.condition()
            .map(ConditionTree::to_condition_string)
            .unwrap_or_default()
    }

    /// The JSON wire form. With `fragment_only` only the WHERE condition is
    /// encoded, unwrapped (`null` if there is none).
    pub fn to_json(&self, fragment_only: bool) -> Value {
        if fragment_only {
            self.condition()
                .map(ConditionTree::to_json)
                .unwrap_or(Value::Null)
        } else {
            self.clauses.to_json()
        }
    }

    /// Edit the WHERE condition with a builder seeded from the current one.
    /// The query is unchanged if the builder reports an error.
    pub fn edit_conditions<F>(&mut self, edit: F) -> Result<&mut Self, QueryError>
    where
        F: FnOnce(&mut ConditionBuilder),
    {
        let mut builder = self
            .condition()
            .map(ConditionBuilder::from_tree)
            .unwrap_or_default();
        edit(&mut builder);
        let tree = builder.get_conditions()?;
        self.set_where((!tree.is_empty()).then_some(tree))
    }

    /// Replace the WHERE condition. The tree is normalized, and rejected
    /// if it negates a negation.
    pub fn set_where(&mut self, condition: Option<ConditionTree>) -> Result<&mut Self, QueryError> {
        self.clauses.where_clause = canonical_condition(condition)?;
        Ok(self)
    }

    /// Replace the HAVING condition, with the same checks as `set_where`
    pub fn set_having(&mut self, condition: Option<ConditionTree>) -> Result<&mut Self, QueryError> {
        self.clauses.having = canonical_condition(condition)?;
        Ok(self)
    }

    pub fn select(&mut self, item: SelectItem) -> &mut Self {
        self.clauses.select.push(item);
        self
    }

    pub fn group_by(&mut self, property: PropertyRef) -> &mut Self {
        self.clauses.group_by.push(property);
        self
    }

    pub fn order_by(&mut self, item: OrderItem) -> &mut Self {
        self.clauses.order_by.push(item);
        self
    }

    pub fn set_limit(&mut self, limit: Option<Limit>) -> &mut Self {
        self.clauses.limit = limit;
        self
    }

    /// The single WHERE condition on `name`
    pub fn get_property_condition(&self, name: &str) -> Result<Option<PropertyCondition>, QueryError> {
        match self.condition() {
            Some(tree) => crate::property_condition(tree, name),
            None => Ok(None),
        }
    }

    /// Every WHERE condition on `name`, in traversal order
    pub fn get_property_conditions(&self, name: &str) -> Vec<PropertyCondition> {
        self.condition()
            .map(|tree| crate::property_conditions(tree, name))
            .unwrap_or_default()
    }
}

fn canonical_condition(condition: Option<ConditionTree>) -> Result<Option<ConditionTree>, QueryError> {
    let Some(tree) = condition else {
        return Ok(None);
    };
    let tree = tree.normalized();
    if tree.find_double_negation().is_some() {
        return Err(QueryError::DoubleNegation);
    }
    Ok((!tree.is_empty()).then_some(tree))
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl FromStr for SearchQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
