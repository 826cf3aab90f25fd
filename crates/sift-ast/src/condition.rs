//! Condition trees for WHERE and HAVING
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Every node
//! records its parent, so editor tooling can walk upwards from a leaf without
//! the tree owning cycles.

use std::fmt;

use serde::Serialize;

use crate::{is_representable, ComparisonError, Literal, PropertyRef, Span};

/// Index of a node inside its [`ConditionTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Between,
    ContainsAny,
    ContainsAll,
    SubstringI,
}

/// How many values an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Two,
    Many,
}

impl ComparisonOp {
    pub const ALL: [ComparisonOp; 12] = [
        ComparisonOp::Eq,
        ComparisonOp::Ne,
        ComparisonOp::Lt,
        ComparisonOp::Le,
        ComparisonOp::Gt,
        ComparisonOp::Ge,
        ComparisonOp::In,
        ComparisonOp::NotIn,
        ComparisonOp::Between,
        ComparisonOp::ContainsAny,
        ComparisonOp::ContainsAll,
        ComparisonOp::SubstringI,
    ];

    /// Text form used in query strings
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::In => "IN",
            ComparisonOp::NotIn => "NOT IN",
            ComparisonOp::Between => "BETWEEN",
            ComparisonOp::ContainsAny => "CONTAINS_ANY",
            ComparisonOp::ContainsAll => "CONTAINS_ALL",
            ComparisonOp::SubstringI => "SUBSTRINGI",
        }
    }

    /// Object key used in the JSON wire format
    pub fn json_key(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::In => "in",
            ComparisonOp::NotIn => "not in",
            ComparisonOp::Between => "between",
            ComparisonOp::ContainsAny => "contains_any",
            ComparisonOp::ContainsAll => "contains_all",
            ComparisonOp::SubstringI => "substringi",
        }
    }

    pub fn from_json_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.json_key() == key)
    }

    pub fn arity(self) -> Arity {
        match self {
            ComparisonOp::In
            | ComparisonOp::NotIn
            | ComparisonOp::ContainsAny
            | ComparisonOp::ContainsAll => Arity::Many,
            ComparisonOp::Between => Arity::Two,
            _ => Arity::One,
        }
    }

    /// Membership operators are the only ones the `$` wildcard may use
    pub fn accepts_wildcard(self) -> bool {
        self.arity() == Arity::Many
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A leaf condition: `property <op> value(s)`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: ComparisonOp,
    pub property: PropertyRef,
    pub values: Vec<Literal>,
}

impl Comparison {
    pub fn new(op: ComparisonOp, property: PropertyRef, values: Vec<Literal>) -> Self {
        Self {
            op,
            property,
            values,
        }
    }

    /// Check value arity and wildcard usage against the operator
    pub fn check(&self) -> Result<(), ComparisonError> {
        if !is_representable(&self.property.source) {
            return Err(ComparisonError::InvalidProperty {
                name: self.property.source.clone(),
            });
        }
        if self.property.is_wildcard() && !self.op.accepts_wildcard() {
            return Err(ComparisonError::WildcardOperator { op: self.op });
        }
        let found = self.values.len();
        let expected = match self.op.arity() {
            Arity::One if found != 1 => "exactly one value",
            Arity::Two if found != 2 => "a lower and an upper bound",
            Arity::Many if found == 0 => "at least one value",
            _ => return Ok(()),
        };
        Err(ComparisonError::Arity {
            op: self.op,
            expected,
            found,
        })
    }
}

/// Kind of a logical group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    And,
    Or,
}

impl GroupKind {
    pub fn keyword(self) -> &'static str {
        match self {
            GroupKind::And => "AND",
            GroupKind::Or => "OR",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            GroupKind::And => "and",
            GroupKind::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// AND / OR over ordered children
    Group(GroupKind, Vec<NodeId>),
    /// Negation of exactly one child
    Not(NodeId),
    Compare(Comparison),
}

#[derive(Debug, Clone)]
pub struct ConditionNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Span,
}

/// Arena-backed condition tree.
///
/// Trees produced by the parser, the JSON decoder and the builder are all
/// passed through [`ConditionTree::normalized`], so equal conditions compare
/// and serialize identically whatever their origin. Equality is structural
/// and ignores spans and node ids.
#[derive(Debug, Clone, Default)]
pub struct ConditionTree {
    nodes: Vec<ConditionNode>,
    root: Option<NodeId>,
}

impl ConditionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree holding a single comparison
    pub fn from_comparison(comparison: Comparison) -> Self {
        let mut tree = Self::new();
        let id = tree.add_compare(comparison, Span::dummy());
        tree.set_root(id);
        tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.nodes[id.0].parent = None;
        self.root = Some(id);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes in the arena, reachable or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> &ConditionNode {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Parents of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Group(_, children) => children,
            NodeKind::Not(child) => std::slice::from_ref(child),
            NodeKind::Compare(_) => &[],
        }
    }

    pub fn comparison(&self, id: NodeId) -> Option<&Comparison> {
        match &self.nodes[id.0].kind {
            NodeKind::Compare(c) => Some(c),
            _ => None,
        }
    }

    /// All nodes in the arena, including ones no longer reachable from the root
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ConditionNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Reachable nodes in depth-first, left-to-right order
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Reachable comparisons in traversal order
    pub fn comparisons(&self) -> impl Iterator<Item = (NodeId, &Comparison)> + '_ {
        self.preorder()
            .into_iter()
            .filter_map(move |id| self.comparison(id).map(|c| (id, c)))
    }

    /// Comparisons on the property called `name`, in traversal order
    pub fn property_conditions(&self, name: &str) -> Vec<NodeId> {
        self.comparisons()
            .filter(|(_, c)| c.property.source == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether the node sits directly under a NOT
    pub fn is_negated(&self, id: NodeId) -> bool {
        self.parent(id)
            .is_some_and(|p| matches!(self.kind(p), NodeKind::Not(_)))
    }

    /// First reachable NOT whose operand is itself a NOT
    pub fn find_double_negation(&self) -> Option<NodeId> {
        self.preorder().into_iter().find(|id| match self.kind(*id) {
            NodeKind::Not(child) => matches!(self.kind(*child), NodeKind::Not(_)),
            _ => false,
        })
    }

    // === Construction ===

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        let children: Vec<NodeId> = match &kind {
            NodeKind::Group(_, children) => children.clone(),
            NodeKind::Not(child) => vec![*child],
            NodeKind::Compare(_) => Vec::new(),
        };
        for child in children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(ConditionNode {
            kind,
            parent: None,
            span,
        });
        id
    }

    pub fn add_compare(&mut self, comparison: Comparison, span: Span) -> NodeId {
        self.push(NodeKind::Compare(comparison), span)
    }

    pub fn add_group(&mut self, kind: GroupKind, children: Vec<NodeId>, span: Span) -> NodeId {
        self.push(NodeKind::Group(kind, children), span)
    }

    pub fn add_not(&mut self, child: NodeId, span: Span) -> NodeId {
        self.push(NodeKind::Not(child), span)
    }

    /// Append `child` to a group node. Returns false if `group` is not a group.
    pub fn push_child(&mut self, group: NodeId, child: NodeId) -> bool {
        match &mut self.nodes[group.0].kind {
            NodeKind::Group(_, children) => children.push(child),
            _ => return false,
        }
        self.nodes[child.0].parent = Some(group);
        true
    }

    /// Copy the subtree at `id` of `other` into this arena
    pub fn import(&mut self, other: &ConditionTree, id: NodeId) -> NodeId {
        let node = other.get(id);
        let kind = match &node.kind {
            NodeKind::Compare(c) => NodeKind::Compare(c.clone()),
            NodeKind::Not(child) => NodeKind::Not(self.import(other, *child)),
            NodeKind::Group(kind, children) => NodeKind::Group(
                *kind,
                children.iter().map(|c| self.import(other, *c)).collect(),
            ),
        };
        self.push(kind, node.span)
    }

    // === Normalization ===

    /// Canonical copy of the reachable tree.
    ///
    /// Empty groups disappear, a group with one child is replaced by that
    /// child, and a group nested in a group of the same kind is spliced into
    /// its parent. Unreachable arena nodes are not copied.
    pub fn normalized(&self) -> ConditionTree {
        let mut out = ConditionTree::new();
        if let Some(root) = self.root {
            if let Some(lowered) = self.lower(root, &mut out) {
                let id = out.materialize(lowered);
                out.set_root(id);
            }
        }
        out
    }

    fn lower(&self, id: NodeId, out: &mut ConditionTree) -> Option<Lowered> {
        let node = self.get(id);
        match &node.kind {
            NodeKind::Compare(c) => Some(Lowered::Node(out.add_compare(c.clone(), node.span))),
            NodeKind::Not(child) => {
                let inner = self.lower(*child, out)?;
                let inner = out.materialize(inner);
                Some(Lowered::Node(out.add_not(inner, node.span)))
            }
            NodeKind::Group(kind, children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match self.lower(*child, out) {
                        None => {}
                        Some(Lowered::Group(k, ids, _)) if k == *kind => {
                            flat.extend(ids.into_iter().map(Lowered::Node));
                        }
                        Some(other) => flat.push(other),
                    }
                }
                if flat.len() <= 1 {
                    return flat.pop();
                }
                let ids = flat.into_iter().map(|l| out.materialize(l)).collect();
                Some(Lowered::Group(*kind, ids, node.span))
            }
        }
    }

    fn materialize(&mut self, lowered: Lowered) -> NodeId {
        match lowered {
            Lowered::Node(id) => id,
            Lowered::Group(kind, ids, span) => self.add_group(kind, ids, span),
        }
    }

    fn same_as(&self, a: NodeId, other: &ConditionTree, b: NodeId) -> bool {
        match (self.kind(a), other.kind(b)) {
            (NodeKind::Compare(x), NodeKind::Compare(y)) => x == y,
            (NodeKind::Not(x), NodeKind::Not(y)) => self.same_as(*x, other, *y),
            (NodeKind::Group(k1, c1), NodeKind::Group(k2, c2)) => {
                k1 == k2
                    && c1.len() == c2.len()
                    && c1.iter().zip(c2).all(|(x, y)| self.same_as(*x, other, *y))
            }
            _ => false,
        }
    }
}

impl PartialEq for ConditionTree {
    fn eq(&self, other: &Self) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => self.same_as(a, other, b),
            _ => false,
        }
    }
}

/// A subtree during normalization whose group node is not yet allocated,
/// so the parent can still splice its children.
enum Lowered {
    Node(NodeId),
    Group(GroupKind, Vec<NodeId>, Span),
}

pub struct Ancestors<'a> {
    tree: &'a ConditionTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eq(name: &str, value: impl Into<Literal>) -> Comparison {
        Comparison::new(ComparisonOp::Eq, PropertyRef::new(name), vec![value.into()])
    }

    #[test]
    fn test_singleton_group_collapses() {
        let mut tree = ConditionTree::new();
        let leaf = tree.add_compare(eq("a", true), Span::dummy());
        let group = tree.add_group(GroupKind::And, vec![leaf], Span::dummy());
        tree.set_root(group);

        let normalized = tree.normalized();
        let root = normalized.root().unwrap();
        assert!(matches!(normalized.kind(root), NodeKind::Compare(_)));
        assert_eq!(normalized, ConditionTree::from_comparison(eq("a", true)));
    }

    #[test]
    fn test_same_kind_groups_are_flattened() {
        let mut tree = ConditionTree::new();
        let a = tree.add_compare(eq("a", 1), Span::dummy());
        let b = tree.add_compare(eq("b", 2), Span::dummy());
        let c = tree.add_compare(eq("c", 3), Span::dummy());
        let inner = tree.add_group(GroupKind::And, vec![b, c], Span::dummy());
        let wrapper = tree.add_group(GroupKind::Or, vec![inner], Span::dummy());
        let root = tree.add_group(GroupKind::And, vec![a, wrapper], Span::dummy());
        tree.set_root(root);

        let normalized = tree.normalized();
        let root = normalized.root().unwrap();
        match normalized.kind(root) {
            NodeKind::Group(GroupKind::And, children) => assert_eq!(children.len(), 3),
            other => panic!("expected flat AND, got {:?}", other),
        }
        assert_eq!(normalized.len(), 4);
    }

    #[test]
    fn test_empty_groups_disappear() {
        let mut tree = ConditionTree::new();
        let empty = tree.add_group(GroupKind::Or, vec![], Span::dummy());
        let root = tree.add_group(GroupKind::And, vec![empty], Span::dummy());
        tree.set_root(root);
        assert!(tree.normalized().is_empty());
    }

    #[test]
    fn test_parent_links_and_ancestors() {
        let mut tree = ConditionTree::new();
        let a = tree.add_compare(eq("a", 1), Span::dummy());
        let not = tree.add_not(a, Span::dummy());
        let b = tree.add_compare(eq("b", 2), Span::dummy());
        let root = tree.add_group(GroupKind::Or, vec![not, b], Span::dummy());
        tree.set_root(root);

        assert_eq!(tree.ancestors(a).collect::<Vec<_>>(), vec![not, root]);
        assert!(tree.is_negated(a));
        assert!(!tree.is_negated(b));
        assert_eq!(tree.preorder(), vec![root, not, a, b]);
    }

    #[test]
    fn test_structural_equality_ignores_spans() {
        let mut left = ConditionTree::new();
        let id = left.add_compare(eq("a", 1), Span::new(6, 11));
        left.set_root(id);
        assert_eq!(left, ConditionTree::from_comparison(eq("a", 1)));
        assert_ne!(left, ConditionTree::from_comparison(eq("a", 2)));
    }

    #[test]
    fn test_property_conditions_in_traversal_order() {
        let mut tree = ConditionTree::new();
        let first = tree.add_compare(eq("multi", 1), Span::dummy());
        let other = tree.add_compare(eq("other", 1), Span::dummy());
        let second = tree.add_compare(eq("multi", 2), Span::dummy());
        let root = tree.add_group(GroupKind::Or, vec![first, other, second], Span::dummy());
        tree.set_root(root);
        assert_eq!(tree.property_conditions("multi"), vec![first, second]);
        assert!(tree.property_conditions("missing").is_empty());
    }

    #[test]
    fn test_comparison_check() {
        assert!(eq("a", 1).check().is_ok());

        let wildcard = Comparison::new(ComparisonOp::Eq, PropertyRef::wildcard(), vec![1.into()]);
        assert_eq!(
            wildcard.check(),
            Err(ComparisonError::WildcardOperator { op: ComparisonOp::Eq })
        );

        let between = Comparison::new(ComparisonOp::Between, PropertyRef::new("a"), vec![1.into()]);
        assert!(matches!(between.check(), Err(ComparisonError::Arity { found: 1, .. })));

        let empty_in = Comparison::new(ComparisonOp::In, PropertyRef::wildcard(), vec![]);
        assert!(matches!(empty_in.check(), Err(ComparisonError::Arity { found: 0, .. })));
    }

    #[test]
    fn test_json_keys_round_trip() {
        for op in ComparisonOp::ALL {
            assert_eq!(ComparisonOp::from_json_key(op.json_key()), Some(op));
        }
        assert_eq!(ComparisonOp::from_json_key("like"), None);
    }
}
