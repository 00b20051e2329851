//! Query solutions: executable access-plan trees.
//!
//! A [`SolutionNode`] tree describes how to retrieve matching documents:
//! scans at the leaves, with fetch/sort/projection/skip/limit wrappers
//! above them. Each parent exclusively owns its children. The node queries
//! (`fetched`, `has_field`, `provided_sort`, `sorted_by_disk_loc`) drive
//! the data-access analysis that wraps a compiled tree into a full
//! [`QuerySolution`].

use std::fmt::{self, Display};

use mudstone_match::MatchExpr;
use mudstone_types::{Direction, FieldPath, IndexModel, KeyPattern, Namespace};

use crate::bounds::IndexBounds;
use crate::query::Projection;

/// One node of an access-plan tree.
#[derive(Debug, Clone)]
pub enum SolutionNode {
    /// Scan the whole collection in natural order.
    CollectionScan {
        ns: Namespace,
        direction: Direction,
        tailable: bool,
        filter: Option<MatchExpr>,
    },
    /// Scan one index over the given bounds.
    IndexScan {
        index: IndexModel,
        bounds: IndexBounds,
        direction: Direction,
        filter: Option<MatchExpr>,
    },
    /// Fetch full documents for the child's results, applying a residual
    /// filter when present.
    Fetch {
        filter: Option<MatchExpr>,
        child: Box<SolutionNode>,
    },
    /// Hash-intersect the children's results.
    AndHash { children: Vec<SolutionNode> },
    /// Merge-intersect children that all produce disk-ordered results.
    AndSorted { children: Vec<SolutionNode> },
    /// Union the children's results.
    Or { children: Vec<SolutionNode> },
    /// Sort the child's results by the given pattern.
    Sort {
        pattern: KeyPattern,
        child: Box<SolutionNode>,
    },
    /// Project the child's results.
    Projection {
        projection: Projection,
        child: Box<SolutionNode>,
    },
    /// Drop the first `n` results.
    Skip { n: u64, child: Box<SolutionNode> },
    /// Stop after `n` results.
    Limit { n: u64, child: Box<SolutionNode> },
}

impl SolutionNode {
    /// Does this node's output already contain full documents?
    pub fn fetched(&self) -> bool {
        match self {
            SolutionNode::CollectionScan { .. } | SolutionNode::Fetch { .. } => true,
            SolutionNode::IndexScan { .. } => false,
            SolutionNode::AndHash { children }
            | SolutionNode::AndSorted { children }
            | SolutionNode::Or { children } => children.iter().all(SolutionNode::fetched),
            SolutionNode::Sort { child, .. }
            | SolutionNode::Projection { child, .. }
            | SolutionNode::Skip { child, .. }
            | SolutionNode::Limit { child, .. } => child.fetched(),
        }
    }

    /// Is `path` present in this node's output without fetching?
    pub fn has_field(&self, path: &FieldPath) -> bool {
        match self {
            SolutionNode::CollectionScan { .. } | SolutionNode::Fetch { .. } => true,
            // Multikey keys are per-element and cannot reproduce the
            // stored field, so a multikey index covers nothing.
            SolutionNode::IndexScan { index, .. } => {
                !index.multikey && index.key_pattern.contains(path)
            }
            // An intersection can surface the field from any child; a
            // union only when every branch provides it.
            SolutionNode::AndHash { children } | SolutionNode::AndSorted { children } => {
                children.iter().any(|c| c.has_field(path))
            }
            SolutionNode::Or { children } => children.iter().all(|c| c.has_field(path)),
            SolutionNode::Projection { projection, child } => {
                projection.retains(path) && child.has_field(path)
            }
            SolutionNode::Sort { child, .. }
            | SolutionNode::Skip { child, .. }
            | SolutionNode::Limit { child, .. } => child.has_field(path),
        }
    }

    /// The ordering this node's output is guaranteed to have, if any.
    pub fn provided_sort(&self) -> Option<KeyPattern> {
        match self {
            SolutionNode::IndexScan {
                index, direction, ..
            } => Some(match direction {
                Direction::Ascending => index.key_pattern.clone(),
                Direction::Descending => index.key_pattern.reversed(),
            }),
            SolutionNode::Sort { pattern, .. } => Some(pattern.clone()),
            SolutionNode::CollectionScan { .. }
            | SolutionNode::AndHash { .. }
            | SolutionNode::AndSorted { .. }
            | SolutionNode::Or { .. } => None,
            SolutionNode::Fetch { child, .. }
            | SolutionNode::Projection { child, .. }
            | SolutionNode::Skip { child, .. }
            | SolutionNode::Limit { child, .. } => child.provided_sort(),
        }
    }

    /// Is the output ordered by document location? Decides whether an AND
    /// may merge-intersect instead of hash-intersect.
    pub fn sorted_by_disk_loc(&self) -> bool {
        match self {
            SolutionNode::CollectionScan { .. } | SolutionNode::AndSorted { .. } => true,
            SolutionNode::IndexScan { .. }
            | SolutionNode::AndHash { .. }
            | SolutionNode::Or { .. }
            | SolutionNode::Sort { .. } => false,
            SolutionNode::Fetch { child, .. }
            | SolutionNode::Projection { child, .. }
            | SolutionNode::Skip { child, .. }
            | SolutionNode::Limit { child, .. } => child.sorted_by_disk_loc(),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            SolutionNode::CollectionScan {
                ns,
                tailable,
                filter,
                ..
            } => {
                write!(f, "{pad}COLLSCAN {ns}")?;
                if *tailable {
                    write!(f, " tailable")?;
                }
                write_filter(f, filter)
            }
            SolutionNode::IndexScan {
                index,
                bounds,
                filter,
                ..
            } => {
                write!(f, "{pad}IXSCAN {} bounds {bounds}", index.name)?;
                write_filter(f, filter)
            }
            SolutionNode::Fetch { filter, child } => {
                write!(f, "{pad}FETCH")?;
                write_filter(f, filter)?;
                writeln!(f)?;
                child.fmt_indented(f, depth + 1)
            }
            SolutionNode::AndHash { children } => {
                write!(f, "{pad}AND_HASH")?;
                for child in children {
                    writeln!(f)?;
                    child.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
            SolutionNode::AndSorted { children } => {
                write!(f, "{pad}AND_SORTED")?;
                for child in children {
                    writeln!(f)?;
                    child.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
            SolutionNode::Or { children } => {
                write!(f, "{pad}OR")?;
                for child in children {
                    writeln!(f)?;
                    child.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
            SolutionNode::Sort { pattern, child } => {
                writeln!(f, "{pad}SORT {pattern}")?;
                child.fmt_indented(f, depth + 1)
            }
            SolutionNode::Projection { child, .. } => {
                writeln!(f, "{pad}PROJ")?;
                child.fmt_indented(f, depth + 1)
            }
            SolutionNode::Skip { n, child } => {
                writeln!(f, "{pad}SKIP {n}")?;
                child.fmt_indented(f, depth + 1)
            }
            SolutionNode::Limit { n, child } => {
                writeln!(f, "{pad}LIMIT {n}")?;
                child.fmt_indented(f, depth + 1)
            }
        }
    }
}

fn write_filter(f: &mut fmt::Formatter<'_>, filter: &Option<MatchExpr>) -> fmt::Result {
    if let Some(filter) = filter {
        write!(f, " filter {filter}")?;
    }
    Ok(())
}

impl Display for SolutionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// One candidate solution: the access-plan tree plus the query context it
/// answers.
#[derive(Debug, Clone)]
pub struct QuerySolution {
    /// The access-plan tree. Exclusively owned.
    pub root: SolutionNode,
    /// The queried namespace.
    pub ns: Namespace,
    /// Cached copy of the full predicate tree this solution answers.
    pub filter: Option<MatchExpr>,
    /// The owned source document the filter was parsed from; kept alive
    /// for the lifetime of the solution.
    pub filter_data: serde_json::Value,
    /// True when a Sort stage had to be added (callers disprefer these
    /// against plans with native index order).
    pub has_sort_stage: bool,
}

impl Display for QuerySolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
