//! Lookup of the conditions placed on a named property

use sift_ast::{Comparison, ConditionTree};

use crate::QueryError;

/// A comparison found on a property, and whether it sits directly under a NOT
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCondition {
    pub comparison: Comparison,
    pub negated: bool,
}

/// Every comparison on `name`, in traversal order
pub fn property_conditions(tree: &ConditionTree, name: &str) -> Vec<PropertyCondition> {
    tree.property_conditions(name)
        .into_iter()
        .filter_map(|id| {
            tree.comparison(id).map(|comparison| PropertyCondition {
                comparison: comparison.clone(),
                negated: tree.is_negated(id),
            })
        })
        .collect()
}

/// The single condition on `name`.
///
/// Repeats of an identical condition count once. Two or more distinct
/// conditions are an error: callers expecting several must use
/// [`property_conditions`].
pub fn property_condition(
    tree: &ConditionTree,
    name: &str,
) -> Result<Option<PropertyCondition>, QueryError> {
    let mut distinct: Vec<PropertyCondition> = Vec::new();
    for found in property_conditions(tree, name) {
        if !distinct.contains(&found) {
            distinct.push(found);
        }
    }

    match distinct.len() {
        0 | 1 => Ok(distinct.pop()),
        count => Err(QueryError::AmbiguousProperty {
            name: name.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_ast::{ComparisonOp, Literal};
    use sift_parser::parse_condition_fragment;

    fn tree(text: &str) -> ConditionTree {
        let parsed = parse_condition_fragment(text);
        assert!(parsed.is_ok(), "{:?}", parsed.errors);
        parsed.clauses.where_clause.unwrap_or_default()
    }

    #[test]
    fn test_lookup_unwraps_not() {
        let tree = tree("a = 1 AND NOT b IN (1, 2)");
        let found = property_condition(&tree, "b").unwrap().unwrap();
        assert!(found.negated);
        assert_eq!(found.comparison.op, ComparisonOp::In);
        assert_eq!(found.comparison.values, vec![Literal::Int(1), Literal::Int(2)]);

        let plain = property_condition(&tree, "a").unwrap().unwrap();
        assert!(!plain.negated);
    }

    #[test]
    fn test_missing_property() {
        let tree = tree("a = 1");
        assert_eq!(property_condition(&tree, "not_present"), Ok(None));
        assert!(property_conditions(&tree, "not_present").is_empty());
    }

    #[test]
    fn test_ambiguous_property() {
        let tree = tree("multiproperty = 1 OR multiproperty = 2");
        assert_eq!(property_conditions(&tree, "multiproperty").len(), 2);
        assert_eq!(
            property_condition(&tree, "multiproperty"),
            Err(QueryError::AmbiguousProperty {
                name: "multiproperty".to_string(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_identical_repeats_count_once() {
        let tree = tree("a = 1 OR (b = 2 AND a = 1)");
        assert_eq!(property_conditions(&tree, "a").len(), 2);
        assert!(property_condition(&tree, "a").unwrap().is_some());
    }

    #[test]
    fn test_bracketed_name_matches_bare_lookup() {
        let tree = tree("[Display Name] SUBSTRINGI \"kev\"");
        assert!(property_condition(&tree, "Display Name").unwrap().is_some());
    }
}
