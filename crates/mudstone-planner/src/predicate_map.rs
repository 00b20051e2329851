//! Predicate map: field path to predicate nodes, with index relevance.
//!
//! The map is built once per planning call from the shared predicate tree,
//! then annotated with which candidate indexes can answer which fields and
//! at what position.

use std::collections::{BTreeMap, BTreeSet};

use mudstone_match::{MatchExpr, NodeId};
use mudstone_types::{FieldPath, IndexModel};

/// Whether a field is the leading key component of an index or a later one.
///
/// Leading components are usable stand-alone; later components only help
/// once every preceding component is bound to a point, which is the
/// enumerator's to establish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Relevance {
    First,
    NotFirst,
}

/// Everything known about the predicates on one field path.
#[derive(Debug, Clone, Default)]
pub struct PredicateInfo {
    /// Predicate-tree nodes referencing this path, in pre-order.
    pub nodes: Vec<NodeId>,
    /// Candidate indexes touching this path: `(position, relevance)`.
    pub relevant: BTreeSet<(usize, Relevance)>,
}

impl PredicateInfo {
    /// Returns true if candidate `pos` rates this field as its leading
    /// component.
    pub fn is_first_for(&self, pos: usize) -> bool {
        self.relevant.contains(&(pos, Relevance::First))
    }

    /// Returns true if candidate `pos` rates this field at all.
    pub fn is_relevant_to(&self, pos: usize) -> bool {
        self.is_first_for(pos) || self.relevant.contains(&(pos, Relevance::NotFirst))
    }
}

/// Ordered mapping from field path to predicate info.
pub type PredicateMap = BTreeMap<FieldPath, PredicateInfo>;

/// Collects every node with a non-empty path into `out`, keyed by path.
///
/// Recursion descends all children of every node kind; array leaves
/// contribute themselves (not their sub-expressions) under their own path.
pub fn build_predicate_map(root: &MatchExpr, out: &mut PredicateMap) {
    if let Some(path) = root.path() {
        if !path.is_empty() {
            out.entry(path.clone()).or_default().nodes.push(root.id());
        }
    }
    // Array-leaf children carry element-relative paths, which are not
    // document paths; only logical children are descended.
    if root.is_logical() {
        for child in root.children() {
            build_predicate_map(child, out);
        }
    }
}

/// Filters `indices` down to those whose leading key component carries at
/// least one predicate. Indexes not prefixed by any predicate field cannot
/// help and are dropped.
pub fn find_relevant_indices(map: &PredicateMap, indices: &[IndexModel]) -> Vec<IndexModel> {
    indices
        .iter()
        .filter(|index| {
            index
                .key_pattern
                .first()
                .is_some_and(|(field, _)| map.contains_key(field))
        })
        .cloned()
        .collect()
}

/// Annotates the map with `(position, relevance)` entries for every field
/// of every relevant index. A predicate may accumulate entries for several
/// indexes.
pub fn rate_indices(indices: &[IndexModel], map: &mut PredicateMap) {
    for (pos, index) in indices.iter().enumerate() {
        for (i, (field, _)) in index.key_pattern.iter().enumerate() {
            if let Some(info) = map.get_mut(field) {
                let relevance = if i == 0 {
                    Relevance::First
                } else {
                    Relevance::NotFirst
                };
                info.relevant.insert((pos, relevance));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudstone_match::parse_filter;
    use mudstone_types::KeyPattern;
    use serde_json::json;

    fn parse(json: serde_json::Value) -> MatchExpr {
        let mut expr = parse_filter(&json).unwrap();
        expr.number();
        expr
    }

    fn index(name: &str, pattern: serde_json::Value) -> IndexModel {
        IndexModel::new(name, KeyPattern::from_json(&pattern).unwrap())
    }

    #[test]
    fn map_collects_every_pathed_node() {
        let expr = parse(json!({
            "a": 1,
            "$or": [{"a": {"$gt": 5}}, {"b": 2}]
        }));
        let mut map = PredicateMap::new();
        build_predicate_map(&expr, &mut map);

        assert_eq!(map.len(), 2);
        assert_eq!(map[&FieldPath::from("a")].nodes.len(), 2);
        assert_eq!(map[&FieldPath::from("b")].nodes.len(), 1);
    }

    #[test]
    fn array_leaves_register_under_their_own_path() {
        let expr = parse(json!({"scores": {"$elemMatch": {"value": {"$gt": 3}}}}));
        let mut map = PredicateMap::new();
        build_predicate_map(&expr, &mut map);

        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&FieldPath::from("scores")));
    }

    #[test]
    fn relevance_requires_a_leading_field_predicate() {
        let expr = parse(json!({"b": 3}));
        let mut map = PredicateMap::new();
        build_predicate_map(&expr, &mut map);

        let indices = vec![
            index("a_1_b_1", json!({"a": 1, "b": 1})),
            index("b_1", json!({"b": 1})),
        ];
        let relevant = find_relevant_indices(&map, &indices);
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].name, "b_1");
    }

    #[test]
    fn rating_marks_first_and_not_first() {
        let expr = parse(json!({"a": 1, "b": 2}));
        let mut map = PredicateMap::new();
        build_predicate_map(&expr, &mut map);

        let indices = vec![
            index("a_1_b_1", json!({"a": 1, "b": 1})),
            index("b_1", json!({"b": 1})),
        ];
        let relevant = find_relevant_indices(&map, &indices);
        assert_eq!(relevant.len(), 2);

        rate_indices(&relevant, &mut map);
        let a = &map[&FieldPath::from("a")];
        let b = &map[&FieldPath::from("b")];
        assert!(a.is_first_for(0));
        assert!(!a.is_relevant_to(1));
        assert!(b.relevant.contains(&(0, Relevance::NotFirst)));
        assert!(b.is_first_for(1));
    }
}
