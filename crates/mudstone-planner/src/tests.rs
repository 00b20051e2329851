//! Integration tests for mudstone-planner.

#![allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
#![allow(clippy::too_many_lines)] // Test functions can be long
#![allow(clippy::similar_names)] // Test variables can have similar names

mod property_tests;

use mudstone_types::{IndexModel, KeyPattern};

use crate::Query;

/// Builds a named index from a JSON key pattern.
fn index(name: &str, pattern: serde_json::Value) -> IndexModel {
    IndexModel::new(name, KeyPattern::from_json(&pattern).unwrap())
}

/// Parses a query over the shared test namespace.
fn query(filter: serde_json::Value) -> Query {
    Query::parse("app.things", filter).unwrap()
}
