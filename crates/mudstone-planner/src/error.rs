//! Planner error types.
//!
//! Unplannable branches inside the planner are signaled by `Option`, never
//! by error: a tagging that compiles to nothing is simply skipped. Errors
//! here are the caller-visible failures only.

use mudstone_types::{KeyPattern, Namespace};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    /// The query demands an indexed path (geo-near) and none compiled.
    #[error("no indexed plan available for {ns}: geo-near requires an index")]
    NoIndexedPlan { ns: Namespace },

    /// The supplied hint names a key pattern no candidate index has.
    #[error("hint {hint} does not match any candidate index on {ns}")]
    UnknownHint { ns: Namespace, hint: KeyPattern },
}

pub type Result<T> = std::result::Result<T, PlanError>;
