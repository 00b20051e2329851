//! Data-access analysis: wrapping a compiled scan tree to satisfy the
//! query's sort, projection, skip, and limit.

use mudstone_match::{MatchExpr, MatchKind};
use mudstone_types::Direction;

use crate::query::Query;
use crate::solution::{QuerySolution, SolutionNode};

/// The query's whole predicate tree as a residual filter; the match-all
/// empty conjunction carries no filter at all.
pub(crate) fn whole_filter(query: &Query) -> Option<MatchExpr> {
    match query.root().kind() {
        MatchKind::And(children) if children.is_empty() => None,
        _ => Some(query.root().clone()),
    }
}

/// Wraps `root` with the stages the query's shape demands and produces the
/// finished solution.
///
/// Stage order, innermost out: fetch-if-uncovered + sort, fetch-if-needed +
/// projection (or an unconditional fetch when no projection was requested
/// and the tree is unfetched), skip, limit.
pub fn analyze_data_access(query: &Query, root: SolutionNode) -> QuerySolution {
    let mut root = root;
    let mut has_sort_stage = false;

    if let Some(sort) = query.sort() {
        // A scan that already emits the requested order needs no stage
        // and no fetch on its behalf.
        if root.provided_sort().as_ref() != Some(sort) {
            if !root.fetched() && !sort.iter().all(|(field, _)| root.has_field(field)) {
                root = SolutionNode::Fetch {
                    filter: None,
                    child: Box::new(root),
                };
            }
            root = SolutionNode::Sort {
                pattern: sort.clone(),
                child: Box::new(root),
            };
            has_sort_stage = true;
        }
    }

    if let Some(projection) = query.projection() {
        let covered = projection
            .required_fields()
            .iter()
            .all(|field| root.has_field(field));
        if !root.fetched() && (projection.requires_document() || !covered) {
            root = SolutionNode::Fetch {
                filter: None,
                child: Box::new(root),
            };
        }
        root = SolutionNode::Projection {
            projection: projection.clone(),
            child: Box::new(root),
        };
    } else if !root.fetched() {
        // Without an explicit projection callers always receive full
        // documents.
        root = SolutionNode::Fetch {
            filter: None,
            child: Box::new(root),
        };
    }

    if query.skip() > 0 {
        root = SolutionNode::Skip {
            n: query.skip(),
            child: Box::new(root),
        };
    }
    if let Some(n) = query.limit() {
        root = SolutionNode::Limit {
            n,
            child: Box::new(root),
        };
    }

    QuerySolution {
        root,
        ns: query.ns().clone(),
        filter: whole_filter(query),
        filter_data: query.filter_data().clone(),
        has_sort_stage,
    }
}

/// The fallback plan: scan the collection, filter every document.
pub fn make_collection_scan(query: &Query, tailable: bool) -> QuerySolution {
    let scan = SolutionNode::CollectionScan {
        ns: query.ns().clone(),
        direction: Direction::Ascending,
        tailable,
        filter: whole_filter(query),
    };
    analyze_data_access(query, scan)
}
