//! Access plan builder: compiles one tagged predicate tree into a scan
//! tree.
//!
//! The builder never mutates the predicate tree. It walks a freshly built,
//! reordered view of each node's children, accumulates per-index scans
//! with merged bounds, and clones whatever leaf fragments it needs into
//! residual filters. Returning `None` marks the branch unplannable under
//! the current tagging; the driver skips that tagging and moves on.

use mudstone_match::{MatchExpr, MatchKind};
use mudstone_types::{Direction, IndexModel};

use crate::bounds::{IndexBounds, translate};
use crate::enumerate::TagSet;
use crate::interval::OrderedIntervalList;
use crate::solution::SolutionNode;

/// Compiles `expr` under the given tagging into an access-plan tree.
///
/// Returns `None` when the tagging cannot produce a valid indexed plan for
/// this subtree: an untagged leaf, an OR with any unindexed child, or a
/// negation/geo-near node.
pub fn build_indexed_data_access(
    expr: &MatchExpr,
    tags: &TagSet,
    indices: &[IndexModel],
) -> Option<SolutionNode> {
    match expr.kind() {
        MatchKind::And(children) => build_and(children, tags, indices),
        MatchKind::Or(children) => build_or(children, tags, indices),
        MatchKind::Not(_) | MatchKind::Nor(_) | MatchKind::GeoNear(_) => None,
        MatchKind::Compare(_) | MatchKind::ElemMatch(_) => build_leaf(expr, tags, indices),
    }
}

/// Accumulates one index scan across sibling predicates sharing an index.
struct ScanAccum {
    index_pos: usize,
    /// Per key component: the merged list plus whether it is still exact.
    components: Vec<Option<(OrderedIntervalList, bool)>>,
}

impl ScanAccum {
    fn start(
        index_pos: usize,
        pattern_len: usize,
        component: usize,
        list: OrderedIntervalList,
        exact: bool,
    ) -> Self {
        let mut components = vec![None; pattern_len];
        components[component] = Some((list, exact));
        Self {
            index_pos,
            components,
        }
    }

    /// Intersects another constraint into one key component.
    ///
    /// Returns whether the incoming predicate is still exactly answered: it
    /// is only when both inputs were exact and the merge stayed a single
    /// contiguous interval. Anything else forces a residual filter.
    fn merge_and(&mut self, component: usize, list: OrderedIntervalList, exact: bool) -> bool {
        match &mut self.components[component] {
            slot @ None => {
                *slot = Some((list, exact));
                exact
            }
            Some((existing, existing_exact)) => {
                existing.join_and(&list);
                let merged_exact = *existing_exact && exact && existing.intervals.len() == 1;
                *existing_exact = merged_exact;
                merged_exact
            }
        }
    }

    fn finish(self, indices: &[IndexModel]) -> SolutionNode {
        let index = indices[self.index_pos].clone();
        let mut bounds = IndexBounds::all_values(&index.key_pattern);
        for (pos, slot) in self.components.into_iter().enumerate() {
            if let Some((list, _)) = slot {
                bounds.fields[pos] = list;
            }
        }
        bounds.orient(&index.key_pattern);
        SolutionNode::IndexScan {
            index,
            bounds,
            direction: Direction::Ascending,
            filter: None,
        }
    }
}

/// Resolves a tagged leaf to its index, key component, and translation.
///
/// # Panics
///
/// Panics when the tag breaks the enumerator contract: a position outside
/// the candidate vector, or an index that does not contain the leaf's
/// field.
fn resolve_tag<'a>(
    leaf: &MatchExpr,
    pos: usize,
    indices: &'a [IndexModel],
) -> (&'a IndexModel, usize, OrderedIntervalList, bool) {
    assert!(
        pos < indices.len(),
        "tag references candidate position {pos} of {}",
        indices.len()
    );
    let index = &indices[pos];
    let path = leaf.path().expect("leaves carry a path");
    let component = index.key_pattern.position_of(path).unwrap_or_else(|| {
        panic!(
            "tagged index {} has no key component for field {path}",
            index.name
        )
    });
    let (list, exact) = translate(leaf, index.multikey);
    (index, component, list, exact)
}

fn build_leaf(leaf: &MatchExpr, tags: &TagSet, indices: &[IndexModel]) -> Option<SolutionNode> {
    let pos = tags.get(leaf.id())?;
    let (index, component, list, exact) = resolve_tag(leaf, pos, indices);

    let scan = ScanAccum::start(pos, index.key_pattern.len(), component, list, exact)
        .finish(indices);
    if exact {
        Some(scan)
    } else {
        Some(SolutionNode::Fetch {
            filter: Some(leaf.clone()),
            child: Box::new(scan),
        })
    }
}

fn build_and(
    children: &[MatchExpr],
    tags: &TagSet,
    indices: &[IndexModel],
) -> Option<SolutionNode> {
    // Reorder into tagged leaves, tagged logical subtrees, and residual
    // predicates without touching the source tree.
    let mut tagged_leaves: Vec<&MatchExpr> = Vec::new();
    let mut tagged_logicals: Vec<&MatchExpr> = Vec::new();
    let mut residual: Vec<MatchExpr> = Vec::new();

    for child in children {
        if matches!(child.kind(), MatchKind::GeoNear(_)) {
            // Geo-near demands its own indexed stage; nothing here can
            // provide one.
            return None;
        }
        if child.is_leaf() {
            if tags.get(child.id()).is_some() {
                tagged_leaves.push(child);
            } else {
                residual.push(child.clone());
            }
        } else if tags.any_in_subtree(child) {
            tagged_logicals.push(child);
        } else {
            residual.push(child.clone());
        }
    }

    // Group same-index leaves together; the sort is stable so children
    // keep their relative order within one index.
    tagged_leaves.sort_by_key(|leaf| tags.get(leaf.id()).expect("leaf is tagged"));

    let mut out: Vec<SolutionNode> = Vec::new();
    let mut accum: Option<ScanAccum> = None;

    for leaf in tagged_leaves {
        let pos = tags.get(leaf.id()).expect("leaf is tagged");
        let (index, component, list, exact) = resolve_tag(leaf, pos, indices);

        match &mut accum {
            Some(acc) if acc.index_pos == pos => {
                if !acc.merge_and(component, list, exact) {
                    residual.push(leaf.clone());
                }
            }
            _ => {
                if let Some(prev) = accum.take() {
                    out.push(prev.finish(indices));
                }
                accum = Some(ScanAccum::start(
                    pos,
                    index.key_pattern.len(),
                    component,
                    list,
                    exact,
                ));
                if !exact {
                    residual.push(leaf.clone());
                }
            }
        }
    }
    if let Some(prev) = accum.take() {
        out.push(prev.finish(indices));
    }

    // A compiled logical child answers itself, filters included; a failed
    // one aborts this whole branch.
    for logical in tagged_logicals {
        out.push(build_indexed_data_access(logical, tags, indices)?);
    }

    if out.is_empty() {
        return None;
    }

    let base = if out.len() == 1 {
        out.pop().expect("one child present")
    } else if out.iter().all(SolutionNode::sorted_by_disk_loc) {
        SolutionNode::AndSorted { children: out }
    } else {
        SolutionNode::AndHash { children: out }
    };

    Some(match combined_filter(residual) {
        None => base,
        Some(filter) => SolutionNode::Fetch {
            filter: Some(filter),
            child: Box::new(base),
        },
    })
}

fn build_or(
    children: &[MatchExpr],
    tags: &TagSet,
    indices: &[IndexModel],
) -> Option<SolutionNode> {
    // Every direct child must be answerable by an index: an OR cannot
    // carry a residual filter for a branch it never scans.
    let mut tagged_leaves: Vec<&MatchExpr> = Vec::new();
    let mut logicals: Vec<&MatchExpr> = Vec::new();
    for child in children {
        if child.is_leaf() {
            if matches!(child.kind(), MatchKind::GeoNear(_)) || tags.get(child.id()).is_none() {
                return None;
            }
            tagged_leaves.push(child);
        } else {
            if !tags.any_in_subtree(child) {
                return None;
            }
            logicals.push(child);
        }
    }

    tagged_leaves.sort_by_key(|leaf| tags.get(leaf.id()).expect("leaf is tagged"));

    // An OR accumulator merges only leaves constraining the same component
    // of the same index; a union across different components is not one
    // rectangle of bounds.
    struct OrAccum {
        index_pos: usize,
        component: usize,
        list: OrderedIntervalList,
    }

    let finish_or = |acc: OrAccum| -> SolutionNode {
        let index = &indices[acc.index_pos];
        ScanAccum::start(
            acc.index_pos,
            index.key_pattern.len(),
            acc.component,
            acc.list,
            true,
        )
        .finish(indices)
    };

    let mut out: Vec<SolutionNode> = Vec::new();
    let mut accum: Option<OrAccum> = None;

    for leaf in tagged_leaves {
        let pos = tags.get(leaf.id()).expect("leaf is tagged");
        let (index, component, list, exact) = resolve_tag(leaf, pos, indices);

        if !exact {
            // Inexact branches scan and re-filter individually; their
            // residual lives on their own fetch, never on the OR.
            let scan = ScanAccum::start(pos, index.key_pattern.len(), component, list, false)
                .finish(indices);
            out.push(SolutionNode::Fetch {
                filter: Some(leaf.clone()),
                child: Box::new(scan),
            });
            continue;
        }

        match &mut accum {
            Some(acc) if acc.index_pos == pos && acc.component == component => {
                acc.list.join_or(&list);
            }
            _ => {
                if let Some(prev) = accum.take() {
                    out.push(finish_or(prev));
                }
                accum = Some(OrAccum {
                    index_pos: pos,
                    component,
                    list,
                });
            }
        }
    }
    if let Some(prev) = accum.take() {
        out.push(finish_or(prev));
    }

    for logical in logicals {
        out.push(build_indexed_data_access(logical, tags, indices)?);
    }

    match out.len() {
        0 => None,
        1 => Some(out.pop().expect("one child present")),
        _ => Some(SolutionNode::Or { children: out }),
    }
}

/// Combines leftover predicates into one residual filter.
fn combined_filter(mut residual: Vec<MatchExpr>) -> Option<MatchExpr> {
    match residual.len() {
        0 => None,
        1 => Some(residual.pop().expect("one residual present")),
        _ => Some(MatchExpr::and(residual)),
    }
}
