//! Tagging enumerator: assigns candidate indexes to predicate leaves.
//!
//! An enumeration pass produces successive alternative taggings of the same
//! predicate tree, one per relevant candidate index. Tags never live on the
//! tree itself: each tagging fills a [`TagSet`] side table keyed by node
//! id, so the tree stays immutable and a tagging is fully consumed by the
//! access builder before the next one overwrites the table.

use std::collections::HashMap;

use mudstone_match::{MatchExpr, MatchKind, NodeId};
use mudstone_types::IndexModel;

use crate::predicate_map::PredicateMap;

/// Assignment of one leaf to one candidate index position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexTag {
    /// Position into the candidate index vector.
    pub index: usize,
}

/// Side table of leaf tags for one enumeration attempt.
#[derive(Debug, Default)]
pub struct TagSet {
    tags: HashMap<NodeId, IndexTag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    pub fn set(&mut self, node: NodeId, index: usize) {
        self.tags.insert(node, IndexTag { index });
    }

    /// Returns the tagged index position for `node`, if any.
    pub fn get(&self, node: NodeId) -> Option<usize> {
        self.tags.get(&node).map(|tag| tag.index)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Number of distinct index positions used by this tagging.
    pub fn distinct_indexes(&self) -> usize {
        let mut seen: Vec<usize> = self.tags.values().map(|tag| tag.index).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    /// Returns true if any node of `expr`'s subtree is tagged.
    pub fn any_in_subtree(&self, expr: &MatchExpr) -> bool {
        let mut found = false;
        expr.walk(&mut |node| {
            if self.tags.contains_key(&node.id()) {
                found = true;
            }
        });
        found
    }
}

/// The index choices a tagging pass may make for one leaf.
enum Choice {
    /// Exactly this candidate position.
    Single(usize),
    /// The first candidate position that rates the leaf.
    Any,
}

/// Produces successive taggings: one per relevant candidate index, in
/// index order, then one combined tagging that lets every leaf use its
/// first-rated candidate (emitted only when it actually spans several
/// indexes, as single-index taggings were already offered).
///
/// Each `next_tagging` call rewrites `tags` in place and returns true, or
/// returns false once every alternative has been offered. The access
/// builder must work for any tagging produced here; taggings are
/// internally consistent (a tagged leaf's index always has that leaf's
/// path in its key pattern).
pub struct PlanEnumerator<'a> {
    root: &'a MatchExpr,
    map: &'a PredicateMap,
    indices: &'a [IndexModel],
    next_index: usize,
    combined_done: bool,
}

impl<'a> PlanEnumerator<'a> {
    pub fn new(root: &'a MatchExpr, map: &'a PredicateMap, indices: &'a [IndexModel]) -> Self {
        Self {
            root,
            map,
            indices,
            next_index: 0,
            combined_done: false,
        }
    }

    /// Advances to the next candidate tagging. Empty taggings (a candidate
    /// whose only predicates sit under negations) are skipped.
    pub fn next_tagging(&mut self, tags: &mut TagSet) -> bool {
        while self.next_index < self.indices.len() {
            let pos = self.next_index;
            self.next_index += 1;

            tags.clear();
            self.tag_subtree(self.root, &Choice::Single(pos), &[], tags);
            if !tags.is_empty() {
                return true;
            }
        }

        if !self.combined_done {
            self.combined_done = true;
            tags.clear();
            self.tag_subtree(self.root, &Choice::Any, &[], tags);
            if tags.distinct_indexes() > 1 {
                return true;
            }
        }

        tags.clear();
        false
    }

    fn tag_subtree(
        &self,
        expr: &MatchExpr,
        choice: &Choice,
        and_equality_siblings: &[&MatchExpr],
        tags: &mut TagSet,
    ) {
        match expr.kind() {
            MatchKind::And(children) => {
                // Equality leaves in this conjunction establish the
                // point-bounds precondition for later key components.
                let equalities: Vec<&MatchExpr> =
                    children.iter().filter(|c| is_equality_leaf(c)).collect();
                for child in children {
                    if child.is_leaf() {
                        self.maybe_tag(child, choice, &equalities, tags);
                    } else {
                        self.tag_subtree(child, choice, &[], tags);
                    }
                }
            }
            MatchKind::Or(children) => {
                for child in children {
                    if child.is_leaf() {
                        self.maybe_tag(child, choice, &[], tags);
                    } else {
                        self.tag_subtree(child, choice, &[], tags);
                    }
                }
            }
            // Negated predicates cannot be answered by index intervals.
            MatchKind::Not(_) | MatchKind::Nor(_) => {}
            MatchKind::Compare(_) | MatchKind::ElemMatch(_) => {
                self.maybe_tag(expr, choice, and_equality_siblings, tags);
            }
            MatchKind::GeoNear(_) => {}
        }
    }

    fn maybe_tag(
        &self,
        leaf: &MatchExpr,
        choice: &Choice,
        and_equalities: &[&MatchExpr],
        tags: &mut TagSet,
    ) {
        match choice {
            Choice::Single(pos) => {
                self.try_tag(leaf, *pos, and_equalities, tags);
            }
            Choice::Any => {
                for pos in 0..self.indices.len() {
                    if self.try_tag(leaf, pos, and_equalities, tags) {
                        break;
                    }
                }
            }
        }
    }

    fn try_tag(
        &self,
        leaf: &MatchExpr,
        pos: usize,
        and_equalities: &[&MatchExpr],
        tags: &mut TagSet,
    ) -> bool {
        if matches!(leaf.kind(), MatchKind::GeoNear(_)) {
            return false;
        }
        let Some(path) = leaf.path() else {
            return false;
        };
        let Some(info) = self.map.get(path) else {
            return false;
        };

        if info.is_first_for(pos) {
            tags.set(leaf.id(), pos);
            return true;
        }
        if !info.is_relevant_to(pos) {
            return false;
        }

        // A later key component is only usable when every preceding
        // component is bound to a point by an equality sibling.
        let pattern = &self.indices[pos].key_pattern;
        let field_pos = pattern
            .position_of(path)
            .expect("rated field is in the key pattern");
        let bound = (0..field_pos).all(|i| {
            let (prefix_field, _) = pattern.field_at(i).expect("position within pattern");
            and_equalities
                .iter()
                .any(|eq| eq.path() == Some(prefix_field))
        });
        if bound {
            tags.set(leaf.id(), pos);
        }
        bound
    }
}

fn is_equality_leaf(expr: &MatchExpr) -> bool {
    matches!(
        expr.kind(),
        MatchKind::Compare(c) if c.op == mudstone_match::CompareOp::Eq
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate_map::{build_predicate_map, find_relevant_indices, rate_indices};
    use mudstone_match::parse_filter;
    use mudstone_types::KeyPattern;
    use serde_json::json;

    fn parse(json: serde_json::Value) -> MatchExpr {
        let mut expr = parse_filter(&json).unwrap();
        expr.number();
        expr
    }

    fn rated(
        expr: &MatchExpr,
        patterns: Vec<serde_json::Value>,
    ) -> (PredicateMap, Vec<IndexModel>) {
        let mut map = PredicateMap::new();
        build_predicate_map(expr, &mut map);
        let indices: Vec<IndexModel> = patterns
            .into_iter()
            .enumerate()
            .map(|(i, p)| IndexModel::new(format!("idx_{i}"), KeyPattern::from_json(&p).unwrap()))
            .collect();
        let relevant = find_relevant_indices(&map, &indices);
        rate_indices(&relevant, &mut map);
        (map, relevant)
    }

    #[test]
    fn one_tagging_per_candidate_index() {
        let expr = parse(json!({"a": 1, "b": 2}));
        let (map, indices) = rated(&expr, vec![json!({"a": 1}), json!({"b": 1})]);

        let mut enumerator = PlanEnumerator::new(&expr, &map, &indices);
        let mut tags = TagSet::new();

        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.get(expr.children()[0].id()), Some(0));
        assert_eq!(tags.get(expr.children()[1].id()), None);

        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.get(expr.children()[0].id()), None);
        assert_eq!(tags.get(expr.children()[1].id()), Some(1));

        // The combined tagging spans both candidates.
        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.get(expr.children()[0].id()), Some(0));
        assert_eq!(tags.get(expr.children()[1].id()), Some(1));

        assert!(!enumerator.next_tagging(&mut tags));
    }

    #[test]
    fn compound_index_tags_later_fields_behind_equalities() {
        let expr = parse(json!({"a": 1, "b": {"$gt": 2}}));
        let (map, indices) = rated(&expr, vec![json!({"a": 1, "b": 1})]);

        let mut enumerator = PlanEnumerator::new(&expr, &map, &indices);
        let mut tags = TagSet::new();
        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn later_field_without_leading_equality_stays_untagged() {
        let expr = parse(json!({"a": {"$gt": 1}, "b": {"$gt": 2}}));
        let (map, indices) = rated(&expr, vec![json!({"a": 1, "b": 1})]);

        let mut enumerator = PlanEnumerator::new(&expr, &map, &indices);
        let mut tags = TagSet::new();
        assert!(enumerator.next_tagging(&mut tags));
        // Only the range on the leading field is tagged.
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get(expr.children()[0].id()), Some(0));
    }

    #[test]
    fn or_branch_leaves_are_tagged_independently() {
        let expr = parse(json!({"$or": [{"a": 1}, {"a": 5}]}));
        let (map, indices) = rated(&expr, vec![json!({"a": 1})]);

        let mut enumerator = PlanEnumerator::new(&expr, &map, &indices);
        let mut tags = TagSet::new();
        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn retagging_clears_previous_assignments() {
        let expr = parse(json!({"a": 1}));
        let (map, indices) = rated(&expr, vec![json!({"a": 1}), json!({"a": 1, "b": 1})]);

        let mut enumerator = PlanEnumerator::new(&expr, &map, &indices);
        let mut tags = TagSet::new();
        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.get(expr.id()), Some(0));
        assert!(enumerator.next_tagging(&mut tags));
        assert_eq!(tags.get(expr.id()), Some(1));
        assert!(!enumerator.next_tagging(&mut tags));
    }
}
