//! # mudstone-types: Core types for Mudstone
//!
//! This crate contains shared types used across the Mudstone query layer:
//! - Document values ([`Value`], [`TypeClass`])
//! - Field identification ([`FieldPath`])
//! - Index key patterns ([`KeyPattern`], [`Direction`])
//! - Candidate index definitions ([`IndexModel`])
//! - Collection identification ([`Namespace`])

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod value;

pub use value::{TypeClass, Value};

// ============================================================================
// Field paths
// ============================================================================

/// A dotted field path into a document, such as `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the raw dotted path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the path is empty (logical nodes carry no path).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the dot-separated components of the path.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Key patterns
// ============================================================================

/// Traversal direction of one index key component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Returns the conventional +1/-1 encoding.
    pub fn as_int(self) -> i64 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }

    /// Parses the conventional +1/-1 encoding.
    pub fn from_int(v: i64) -> Option<Self> {
        match v {
            1 => Some(Direction::Ascending),
            -1 => Some(Direction::Descending),
            _ => None,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

/// Error raised when a JSON document cannot be read as a key pattern.
#[derive(Debug, Error)]
pub enum KeyPatternError {
    #[error("key pattern must be a non-empty object, got {0}")]
    NotAnObject(String),

    #[error("key pattern field '{field}' has invalid direction {value} (expected 1 or -1)")]
    BadDirection { field: String, value: String },
}

/// An ordered list of `(field, direction)` index key components.
///
/// The same shape describes both index key patterns and requested sort
/// orders, so sort satisfaction checks are plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyPattern {
    fields: Vec<(FieldPath, Direction)>,
}

impl KeyPattern {
    pub fn new(fields: Vec<(FieldPath, Direction)>) -> Self {
        Self { fields }
    }

    /// Builds an all-ascending pattern from field names.
    pub fn ascending<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|f| (FieldPath::new(f), Direction::Ascending))
                .collect(),
        }
    }

    /// Reads a pattern from a JSON document such as `{"a": 1, "b": -1}`.
    ///
    /// Field order in the document is the key order.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, KeyPatternError> {
        let serde_json::Value::Object(map) = json else {
            return Err(KeyPatternError::NotAnObject(json.to_string()));
        };
        if map.is_empty() {
            return Err(KeyPatternError::NotAnObject(json.to_string()));
        }

        let mut fields = Vec::with_capacity(map.len());
        for (field, dir) in map {
            let direction = dir
                .as_i64()
                .and_then(Direction::from_int)
                .ok_or_else(|| KeyPatternError::BadDirection {
                    field: field.clone(),
                    value: dir.to_string(),
                })?;
            fields.push((FieldPath::new(field.clone()), direction));
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(FieldPath, Direction)> {
        self.fields.iter()
    }

    /// Returns the leading key component, if any.
    pub fn first(&self) -> Option<&(FieldPath, Direction)> {
        self.fields.first()
    }

    pub fn field_at(&self, pos: usize) -> Option<&(FieldPath, Direction)> {
        self.fields.get(pos)
    }

    /// Returns the position of `path` in the key pattern.
    pub fn position_of(&self, path: &FieldPath) -> Option<usize> {
        self.fields.iter().position(|(f, _)| f == path)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.position_of(path).is_some()
    }

    /// Returns the pattern with every direction flipped.
    pub fn reversed(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(f, d)| (f.clone(), d.reverse()))
                .collect(),
        }
    }
}

impl Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, (field, dir)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}: {}", dir.as_int())?;
        }
        write!(f, " }}")
    }
}

// ============================================================================
// Index definitions
// ============================================================================

/// A candidate index definition supplied by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexModel {
    /// Index name, such as `a_1_b_1`.
    pub name: String,
    /// Ordered key components.
    pub key_pattern: KeyPattern,
    /// True when any indexed field holds array values for some document.
    pub multikey: bool,
    /// True when the index enforces key uniqueness.
    pub unique: bool,
}

impl IndexModel {
    pub fn new(name: impl Into<String>, key_pattern: KeyPattern) -> Self {
        Self {
            name: name.into(),
            key_pattern,
            multikey: false,
            unique: false,
        }
    }

    pub fn multikey(mut self, multikey: bool) -> Self {
        self.multikey = multikey;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

impl Display for IndexModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.key_pattern)
    }
}

// ============================================================================
// Namespaces
// ============================================================================

/// A `database.collection` identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(ns: impl Into<String>) -> Self {
        Self(ns.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the database portion, up to the first dot.
    pub fn db(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(db, _)| db)
    }

    /// Returns the collection portion, after the first dot.
    pub fn collection(&self) -> &str {
        self.0.split_once('.').map_or("", |(_, coll)| coll)
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pattern_preserves_field_order() {
        let pattern = KeyPattern::from_json(&serde_json::json!({"b": 1, "a": -1})).unwrap();
        let fields: Vec<_> = pattern.iter().map(|(f, d)| (f.as_str(), *d)).collect();
        assert_eq!(
            fields,
            vec![("b", Direction::Ascending), ("a", Direction::Descending)]
        );
    }

    #[test]
    fn key_pattern_rejects_bad_direction() {
        let err = KeyPattern::from_json(&serde_json::json!({"a": 2})).unwrap_err();
        assert!(matches!(err, KeyPatternError::BadDirection { .. }));
    }

    #[test]
    fn key_pattern_rejects_non_objects() {
        assert!(KeyPattern::from_json(&serde_json::json!([1, 2])).is_err());
        assert!(KeyPattern::from_json(&serde_json::json!({})).is_err());
    }

    #[test]
    fn position_of_finds_components() {
        let pattern = KeyPattern::ascending(["a", "b"]);
        assert_eq!(pattern.position_of(&FieldPath::from("b")), Some(1));
        assert_eq!(pattern.position_of(&FieldPath::from("c")), None);
    }

    #[test]
    fn namespace_splits_on_first_dot() {
        let ns = Namespace::from("app.users.archive");
        assert_eq!(ns.db(), "app");
        assert_eq!(ns.collection(), "users.archive");
    }
}
