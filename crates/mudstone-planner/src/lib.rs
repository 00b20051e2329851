//! # mudstone-planner: Query planning core for Mudstone
//!
//! This crate turns a parsed predicate tree plus a set of candidate index
//! definitions into one or more executable access plans: trees of
//! scan/fetch/sort/filter nodes describing how to retrieve matching
//! documents.
//!
//! ## Pipeline
//!
//! 1. [`build_predicate_map`] flattens the tree into a field-path map.
//! 2. [`find_relevant_indices`] / [`rate_indices`] keep and rate the
//!    candidates whose leading key component carries a predicate.
//! 3. [`PlanEnumerator`] produces successive taggings, assigning candidate
//!    indexes to leaves through a [`TagSet`] side table.
//! 4. [`build_indexed_data_access`] compiles each tagged tree into a scan
//!    tree, merging interval bounds for predicates sharing an index and
//!    attaching residual filters for what the index cannot fully answer.
//! 5. [`analyze_data_access`] wraps the result with sort, projection,
//!    skip, and limit stages as the query's shape demands.
//! 6. [`plan`] orchestrates the above, honors hints, snapshot, and
//!    tailable cursors, and appends the collection-scan safety net.
//!
//! Planning is synchronous, allocation-only work over in-memory trees;
//! nothing here touches storage. Each call owns its own map and tag table,
//! so concurrent planning of independent queries needs no coordination.
//!
//! ## Usage
//!
//! ```
//! use mudstone_planner::{Query, plan};
//! use mudstone_types::{IndexModel, KeyPattern};
//! use serde_json::json;
//!
//! let query = Query::parse("app.users", json!({"age": {"$gte": 21}}))?;
//! let indices = vec![IndexModel::new(
//!     "age_1",
//!     KeyPattern::from_json(&json!({"age": 1}))?,
//! )];
//!
//! let solutions = plan(&query, &indices)?;
//! // Indexed plan first, collection-scan safety net last.
//! assert_eq!(solutions.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod access;
mod analyzer;
mod bounds;
mod enumerate;
mod error;
mod interval;
mod planner;
mod predicate_map;
mod query;
mod solution;

#[cfg(test)]
mod tests;

pub use access::build_indexed_data_access;
pub use analyzer::{analyze_data_access, make_collection_scan};
pub use bounds::{IndexBounds, SimpleRange, index_bounds_for_query, translate};
pub use enumerate::{IndexTag, PlanEnumerator, TagSet};
pub use error::{PlanError, Result};
pub use interval::{Interval, IntervalComparison, OrderedIntervalList};
pub use planner::plan;
pub use predicate_map::{
    PredicateInfo, PredicateMap, Relevance, build_predicate_map, find_relevant_indices,
    rate_indices,
};
pub use query::{Projection, Query};
pub use solution::{QuerySolution, SolutionNode};
