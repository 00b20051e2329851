//! The planner driver: candidate discovery, enumeration, and fallbacks.

use tracing::{debug, trace};

use mudstone_types::{IndexModel, KeyPattern};

use crate::access::build_indexed_data_access;
use crate::analyzer::{analyze_data_access, make_collection_scan, whole_filter};
use crate::bounds::IndexBounds;
use crate::enumerate::{PlanEnumerator, TagSet};
use crate::error::{PlanError, Result};
use crate::predicate_map::{PredicateMap, build_predicate_map, find_relevant_indices, rate_indices};
use crate::query::Query;
use crate::solution::{QuerySolution, SolutionNode};

/// Plans `query` against the collection's candidate indexes.
///
/// Returns every candidate solution in enumeration order, with the
/// safety-net collection scan last. The result is never empty: a query
/// that admits no plan at all (geo-near with no usable index) is an
/// explicit [`PlanError`] instead.
pub fn plan(query: &Query, indices: &[IndexModel]) -> Result<Vec<QuerySolution>> {
    let root = query.root();
    let has_geo_near = root.has_geo_near();
    let mut out: Vec<QuerySolution> = Vec::new();

    debug!(
        ns = %query.ns(),
        candidates = indices.len(),
        tailable = query.is_tailable(),
        snapshot = query.is_snapshot(),
        hinted = query.hint().is_some(),
        "planning query"
    );

    let mut map = PredicateMap::new();
    build_predicate_map(root, &mut map);

    // Tailable cursors follow the natural order of the collection and
    // never use secondary indexes.
    if query.is_tailable() && !has_geo_near {
        out.push(make_collection_scan(query, true));
        return Ok(out);
    }

    // Negations are expected to be rewritten upstream; a surviving one
    // falls straight back to filtering a full scan.
    if root.has_not_or_nor() && !has_geo_near {
        debug!(ns = %query.ns(), "negation survived rewrite, using collection scan");
        out.push(make_collection_scan(query, false));
        return Ok(out);
    }

    // The working index set: a hint or snapshot pins one index, otherwise
    // relevance filtering applies.
    let relevant: Vec<IndexModel> = if let Some(hint) = query.hint() {
        let hinted = indices
            .iter()
            .find(|index| index.key_pattern == *hint)
            .ok_or_else(|| PlanError::UnknownHint {
                ns: query.ns().clone(),
                hint: hint.clone(),
            })?;
        vec![hinted.clone()]
    } else if query.is_snapshot() {
        let id_pattern = KeyPattern::ascending(["_id"]);
        match indices.iter().find(|index| index.key_pattern == id_pattern) {
            Some(id_index) => vec![id_index.clone()],
            None => {
                out.push(make_collection_scan(query, false));
                return Ok(out);
            }
        }
    } else {
        find_relevant_indices(&map, indices)
    };
    debug!(ns = %query.ns(), relevant = relevant.len(), "rated candidate indexes");

    if !relevant.is_empty() {
        rate_indices(&relevant, &mut map);

        let mut enumerator = PlanEnumerator::new(root, &map, &relevant);
        let mut tags = TagSet::new();
        while enumerator.next_tagging(&mut tags) {
            trace!(ns = %query.ns(), tagged = tags.len(), "trying tagging");
            if let Some(soln_root) = build_indexed_data_access(root, &tags, &relevant) {
                out.push(analyze_data_access(query, soln_root));
            }
        }
    }

    // A hint must be honored even when no tagging compiled: scan the whole
    // hinted index rather than give up.
    if query.hint().is_some() && out.is_empty() {
        let hinted = relevant.first().expect("hint resolved above");
        out.push(analyze_data_access(query, full_index_scan(hinted, query)));
    }

    // Provide the requested sort from an index when every solution so far
    // needs a Sort stage.
    if let Some(sort) = query.sort() {
        if out.iter().all(|solution| solution.has_sort_stage) {
            if let Some(index) = indices.iter().find(|index| index.key_pattern == *sort) {
                debug!(ns = %query.ns(), index = %index.name, "adding sort-providing index scan");
                out.push(analyze_data_access(query, full_index_scan(index, query)));
            }
        }
    }

    // The safety net. Geo-near mandates an indexed path, so it is the one
    // query shape that may end with no solution at all.
    if !has_geo_near {
        out.push(make_collection_scan(query, false));
    }

    if out.is_empty() {
        return Err(PlanError::NoIndexedPlan {
            ns: query.ns().clone(),
        });
    }
    debug!(ns = %query.ns(), solutions = out.len(), "planning complete");
    Ok(out)
}

/// A scan over every key of `index`, filtering after the fetch.
fn full_index_scan(index: &IndexModel, query: &Query) -> SolutionNode {
    let scan = SolutionNode::IndexScan {
        index: index.clone(),
        bounds: IndexBounds::whole_range(&index.key_pattern),
        direction: mudstone_types::Direction::Ascending,
        filter: None,
    };
    match whole_filter(query) {
        Some(filter) => SolutionNode::Fetch {
            filter: Some(filter),
            child: Box::new(scan),
        },
        None => scan,
    }
}
