//! Fluent construction of condition trees
//!
//! The builder keeps a stack of focused groups. The bottom of the stack is
//! an implicit AND at the root; [`ConditionBuilder::and`] and
//! [`ConditionBuilder::or`] open a nested group and focus it, and
//! [`ConditionBuilder::end`] returns focus to the enclosing group.
//!
//! ```
//! use sift_query::ConditionBuilder;
//!
//! let mut builder = ConditionBuilder::new();
//! builder
//!     .equals("account.id", "67108880")
//!     .not()
//!     .in_("account.id", ["1", "2"]);
//! let tree = builder.get_conditions().unwrap();
//! assert_eq!(
//!     tree.to_condition_string(),
//!     "account.id = \"67108880\" AND NOT account.id IN (\"1\", \"2\")"
//! );
//! ```

use sift_ast::{
    Comparison, ComparisonOp, ConditionTree, GroupKind, Literal, NodeId, PropertyRef, Span,
};
use sift_parser::parse_condition_fragment;
use tracing::debug;

use crate::lookup::{property_condition, property_conditions, PropertyCondition};
use crate::QueryError;

#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    tree: ConditionTree,
    root: NodeId,
    focus: Vec<NodeId>,
    negate_next: bool,
    /// First misuse seen; reported by `get_conditions`
    error: Option<QueryError>,
}

impl Default for ConditionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionBuilder {
    pub fn new() -> Self {
        let mut tree = ConditionTree::new();
        let root = tree.add_group(GroupKind::And, Vec::new(), Span::dummy());
        tree.set_root(root);
        Self {
            tree,
            root,
            focus: Vec::new(),
            negate_next: false,
            error: None,
        }
    }

    /// Start from an existing condition; new conditions are ANDed onto it
    pub fn from_tree(existing: &ConditionTree) -> Self {
        let mut builder = Self::new();
        if let Some(root) = existing.root() {
            let imported = builder.tree.import(existing, root);
            builder.tree.push_child(builder.root, imported);
        }
        builder
    }

    /// Start from a condition written as text, e.g. `kevin = true, age > 3`
    pub fn from_fragment(text: &str) -> Result<Self, QueryError> {
        let parsed = parse_condition_fragment(text);
        if parsed.has_errors() {
            return Err(QueryError::Parse(parsed.errors));
        }
        Ok(parsed
            .condition()
            .map(Self::from_tree)
            .unwrap_or_default())
    }

    fn current(&self) -> NodeId {
        self.focus.last().copied().unwrap_or(self.root)
    }

    fn fail(&mut self, error: QueryError) {
        debug!(%error, "condition builder misuse");
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Attach a node to the focused group, consuming a pending `not()`
    fn attach(&mut self, id: NodeId) {
        let id = if std::mem::take(&mut self.negate_next) {
            self.tree.add_not(id, Span::dummy())
        } else {
            id
        };
        let focus = self.current();
        self.tree.push_child(focus, id);
    }

    fn open(&mut self, kind: GroupKind) -> &mut Self {
        let group = self.tree.add_group(kind, Vec::new(), Span::dummy());
        self.attach(group);
        self.focus.push(group);
        self
    }

    /// Open an AND group inside the focused group and focus it
    pub fn and(&mut self) -> &mut Self {
        self.open(GroupKind::And)
    }

    /// Open an OR group inside the focused group and focus it
    pub fn or(&mut self) -> &mut Self {
        self.open(GroupKind::Or)
    }

    /// Close the focused group. Closing at the root does nothing.
    /// A pending `not()` does not carry over into the enclosing group.
    pub fn end(&mut self) -> &mut Self {
        if std::mem::take(&mut self.negate_next) {
            self.fail(QueryError::DanglingNegation);
        }
        self.focus.pop();
        self
    }

    /// Negate the next condition or group
    pub fn not(&mut self) -> &mut Self {
        if self.negate_next {
            self.fail(QueryError::DoubleNegation);
        }
        self.negate_next = true;
        self
    }

    pub fn equals(&mut self, property: &str, value: impl Into<Literal>) -> &mut Self {
        self.compare(ComparisonOp::Eq, property, vec![value.into()])
    }

    pub fn not_equals(&mut self, property: &str, value: impl Into<Literal>) -> &mut Self {
        self.compare(ComparisonOp::Ne, property, vec![value.into()])
    }

    pub fn in_<I, V>(&mut self, property: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.compare(ComparisonOp::In, property, values)
    }

    pub fn not_in<I, V>(&mut self, property: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.compare(ComparisonOp::NotIn, property, values)
    }

    /// Append any comparison to the focused group
    pub fn compare(&mut self, op: ComparisonOp, property: &str, values: Vec<Literal>) -> &mut Self {
        let comparison = Comparison::new(op, PropertyRef::new(property), values);
        if let Err(error) = comparison.check() {
            self.negate_next = false;
            self.fail(error.into());
            return self;
        }
        let id = self.tree.add_compare(comparison, Span::dummy());
        self.attach(id);
        self
    }

    /// The built condition in canonical form. A root AND with one child
    /// becomes that child; an empty builder yields an empty tree.
    pub fn get_conditions(&self) -> Result<ConditionTree, QueryError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.negate_next {
            return Err(QueryError::DanglingNegation);
        }
        let tree = self.tree.normalized();
        if tree.find_double_negation().is_some() {
            return Err(QueryError::DoubleNegation);
        }
        Ok(tree)
    }

    /// The single condition on `name`, unwrapping one NOT
    pub fn get_property_condition(&self, name: &str) -> Result<Option<PropertyCondition>, QueryError> {
        property_condition(&self.get_conditions()?, name)
    }

    /// Every condition on `name`, in traversal order
    pub fn get_property_conditions(&self, name: &str) -> Result<Vec<PropertyCondition>, QueryError> {
        Ok(property_conditions(&self.get_conditions()?, name))
    }
}
