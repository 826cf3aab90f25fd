//! JSON wire format
//!
//! Comparisons encode as `{ "<op>": [ { "source": <property> }, values... ] }`,
//! groups as `{ "and" | "or": [children...] }` and negation as
//! `{ "not": <child> }`. Key names are part of the wire contract with the
//! search services and must not change.

use serde_json::{json, Map, Value};

use crate::{
    is_representable, Aggregate, ClauseKind, ClauseSet, Comparison, ComparisonOp, ConditionTree,
    GroupKind, JsonError, Limit, Literal, NodeId, NodeKind, OrderDirection, OrderItem,
    PropertyRef, SelectExpr, SelectItem, Span,
};

const SOURCE: &str = "source";
const ALIAS: &str = "as";
const DIRECTION: &str = "direction";
const INFINITY: &str = "infinity";

// ===== Values =====

impl Literal {
    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Int(n) => json!(n),
            Literal::Float(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        match value {
            Value::String(s) => Ok(Literal::String(s.clone())),
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Null => Ok(Literal::Null),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Literal::Int(i)),
                (None, Some(f)) => Ok(Literal::Float(f)),
                _ => Err(JsonError::shape("a number", value)),
            },
            _ => Err(JsonError::shape("a literal value", value)),
        }
    }
}

impl PropertyRef {
    pub fn to_json(&self) -> Value {
        single_key(SOURCE, Value::String(self.source.clone()))
    }

    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        let name = value
            .get(SOURCE)
            .and_then(Value::as_str)
            .ok_or_else(|| JsonError::shape("a property object with a \"source\" string", value))?;
        if !is_representable(name) {
            return Err(JsonError::InvalidProperty {
                name: name.to_string(),
            });
        }
        Ok(PropertyRef::new(name))
    }
}

// ===== Conditions =====

impl ConditionTree {
    /// Encode the tree; an empty tree encodes as `null`
    pub fn to_json(&self) -> Value {
        self.root()
            .map(|root| self.node_to_json(root))
            .unwrap_or(Value::Null)
    }

    fn node_to_json(&self, id: NodeId) -> Value {
        match self.kind(id) {
            NodeKind::Compare(c) => {
                let mut operands = Vec::with_capacity(c.values.len() + 1);
                operands.push(c.property.to_json());
                operands.extend(c.values.iter().map(Literal::to_json));
                single_key(c.op.json_key(), Value::Array(operands))
            }
            NodeKind::Not(child) => single_key("not", self.node_to_json(*child)),
            NodeKind::Group(kind, children) => single_key(
                kind.json_key(),
                Value::Array(children.iter().map(|c| self.node_to_json(*c)).collect()),
            ),
        }
    }

    /// Decode and normalize a condition tree
    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        let mut raw = ConditionTree::new();
        let root = decode_node(value, &mut raw)?;
        raw.set_root(root);
        let tree = raw.normalized();
        if tree.find_double_negation().is_some() {
            return Err(JsonError::DoubleNegation);
        }
        Ok(tree)
    }
}

fn single_key(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn decode_node(value: &Value, tree: &mut ConditionTree) -> Result<NodeId, JsonError> {
    let (key, body) = match value.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .ok_or_else(|| JsonError::shape("a single-key condition object", value))?,
        _ => return Err(JsonError::shape("a single-key condition object", value)),
    };

    match key.as_str() {
        "and" | "or" => {
            let kind = if key == "and" { GroupKind::And } else { GroupKind::Or };
            let items = body
                .as_array()
                .ok_or_else(|| JsonError::shape("an array of conditions", body))?;
            if items.is_empty() {
                return Err(JsonError::EmptyGroup { key: key.clone() });
            }
            let children = items
                .iter()
                .map(|item| decode_node(item, tree))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tree.add_group(kind, children, Span::dummy()))
        }
        "not" => {
            let child = decode_node(body, tree)?;
            Ok(tree.add_not(child, Span::dummy()))
        }
        _ => {
            let op = ComparisonOp::from_json_key(key)
                .ok_or_else(|| JsonError::UnknownOperator { key: key.clone() })?;
            let operands = body
                .as_array()
                .ok_or_else(|| JsonError::shape("an operand array", body))?;
            let (property, values) = operands
                .split_first()
                .ok_or_else(|| JsonError::shape("a property followed by values", body))?;
            let property = PropertyRef::from_json(property)?;
            let values = values
                .iter()
                .map(Literal::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            let comparison = Comparison::new(op, property, values);
            comparison.check()?;
            Ok(tree.add_compare(comparison, Span::dummy()))
        }
    }
}

// ===== Clauses =====

impl SelectItem {
    pub fn to_json(&self) -> Value {
        let mut map = match &self.expr {
            SelectExpr::All => return Value::String("*".to_string()),
            SelectExpr::Property(p) => {
                let mut map = Map::new();
                map.insert(SOURCE.to_string(), Value::String(p.source.clone()));
                map
            }
            SelectExpr::Aggregate { function, property } => {
                let mut map = Map::new();
                map.insert(function.json_key().to_string(), property.to_json());
                map
            }
        };
        if let Some(alias) = &self.alias {
            map.insert(ALIAS.to_string(), Value::String(alias.clone()));
        }
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        if value.as_str() == Some("*") {
            return Ok(SelectItem::new(SelectExpr::All));
        }
        let map = value
            .as_object()
            .ok_or_else(|| JsonError::shape("a select item", value))?;
        let alias = match map.get(ALIAS) {
            None => None,
            Some(Value::String(alias)) => Some(alias.clone()),
            Some(other) => return Err(JsonError::shape("a string alias", other)),
        };

        let expr = if map.contains_key(SOURCE) {
            SelectExpr::Property(PropertyRef::from_json(value)?)
        } else {
            let (name, argument) = map
                .iter()
                .find(|(k, _)| k.as_str() != ALIAS)
                .ok_or_else(|| JsonError::shape("a property or aggregate", value))?;
            let function = Aggregate::ALL
                .into_iter()
                .find(|f| f.json_key() == name.as_str())
                .ok_or_else(|| JsonError::UnknownFunction { name: name.clone() })?;
            SelectExpr::Aggregate {
                function,
                property: PropertyRef::from_json(argument)?,
            }
        };

        Ok(SelectItem {
            expr,
            alias,
            span: Span::dummy(),
        })
    }
}

impl OrderItem {
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(SOURCE.to_string(), Value::String(self.property.source.clone()));
        if let Some(direction) = self.direction {
            let key = match direction {
                OrderDirection::Asc => "asc",
                OrderDirection::Desc => "desc",
            };
            map.insert(DIRECTION.to_string(), Value::String(key.to_string()));
        }
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        let property = PropertyRef::from_json(value)?;
        let direction = match value.get(DIRECTION) {
            None => None,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("asc") => Some(OrderDirection::Asc),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("desc") => Some(OrderDirection::Desc),
            Some(other) => {
                return Err(JsonError::InvalidDirection {
                    found: other.to_string(),
                })
            }
        };
        Ok(OrderItem::new(property, direction))
    }
}

impl Limit {
    pub fn to_json(&self) -> Value {
        match self {
            Limit::Count(n) => json!(n),
            Limit::Infinity => Value::String(INFINITY.to_string()),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        match value {
            Value::Number(n) => n.as_u64().map(Limit::Count).ok_or_else(|| JsonError::InvalidLimit {
                found: n.to_string(),
            }),
            Value::String(s) if s.eq_ignore_ascii_case(INFINITY) => Ok(Limit::Infinity),
            other => Err(JsonError::InvalidLimit {
                found: other.to_string(),
            }),
        }
    }
}

fn decode_list<T>(
    value: &Value,
    decode: impl Fn(&Value) -> Result<T, JsonError>,
) -> Result<Vec<T>, JsonError> {
    value
        .as_array()
        .ok_or_else(|| JsonError::shape("an array", value))?
        .iter()
        .map(decode)
        .collect()
}

impl ClauseSet {
    /// Encode every present clause; absent clauses are omitted
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if !self.select.is_empty() {
            let items = self.select.iter().map(SelectItem::to_json).collect();
            map.insert(ClauseKind::Select.json_key().to_string(), Value::Array(items));
        }
        if let Some(tree) = self.where_clause.as_ref().filter(|t| !t.is_empty()) {
            map.insert(ClauseKind::Where.json_key().to_string(), tree.to_json());
        }
        if !self.group_by.is_empty() {
            let items = self.group_by.iter().map(PropertyRef::to_json).collect();
            map.insert(ClauseKind::GroupBy.json_key().to_string(), Value::Array(items));
        }
        if let Some(tree) = self.having.as_ref().filter(|t| !t.is_empty()) {
            map.insert(ClauseKind::Having.json_key().to_string(), tree.to_json());
        }
        if !self.order_by.is_empty() {
            let items = self.order_by.iter().map(OrderItem::to_json).collect();
            map.insert(ClauseKind::OrderBy.json_key().to_string(), Value::Array(items));
        }
        if let Some(limit) = &self.limit {
            map.insert(ClauseKind::Limit.json_key().to_string(), limit.to_json());
        }
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Result<Self, JsonError> {
        let map = value
            .as_object()
            .ok_or_else(|| JsonError::shape("a query object", value))?;
        let mut clauses = ClauseSet::default();
        for (key, body) in map {
            match key.as_str() {
                "select" => clauses.select = decode_list(body, SelectItem::from_json)?,
                "where" => clauses.where_clause = decode_condition(body)?,
                "group_by" => clauses.group_by = decode_list(body, PropertyRef::from_json)?,
                "having" => clauses.having = decode_condition(body)?,
                "order_by" => clauses.order_by = decode_list(body, OrderItem::from_json)?,
                "limit" => clauses.limit = Some(Limit::from_json(body)?),
                _ => return Err(JsonError::UnknownClause { key: key.clone() }),
            }
        }
        Ok(clauses)
    }
}

fn decode_condition(value: &Value) -> Result<Option<ConditionTree>, JsonError> {
    if value.is_null() {
        return Ok(None);
    }
    let tree = ConditionTree::from_json(value)?;
    Ok((!tree.is_empty()).then_some(tree))
}
