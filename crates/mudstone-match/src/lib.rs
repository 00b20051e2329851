//! # mudstone-match: Predicate trees for Mudstone
//!
//! This crate defines the boolean match-expression trees that the query
//! planner compiles into access plans:
//! - Tree nodes ([`MatchExpr`], [`MatchKind`]) with stable [`NodeId`]s
//! - Comparison, array, and geo-near leaves ([`CompareExpr`],
//!   [`ElemMatchExpr`], [`GeoNearExpr`])
//! - A JSON filter parser ([`parse_filter`])
//! - Document-side evaluation ([`MatchExpr::matches`]) used for residual
//!   filters and tests
//!
//! Planner state never lives on the tree: index assignments are stored in
//! side tables keyed by [`NodeId`], so one tree can back many planning
//! attempts concurrently.

mod error;
mod expr;
mod parser;

pub use error::MatchParseError;
pub use expr::{CompareExpr, CompareOp, ElemMatchExpr, GeoNearExpr, MatchExpr, MatchKind, NodeId};
pub use parser::parse_filter;
