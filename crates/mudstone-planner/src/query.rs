//! The planned query surface: filter plus sort/projection/skip/limit and
//! planning directives (tailable, hint, snapshot).

use mudstone_match::{MatchExpr, MatchParseError, parse_filter};
use mudstone_types::{FieldPath, KeyPattern, Namespace};

/// A requested projection: an inclusion or exclusion field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<FieldPath>,
    inclusive: bool,
}

impl Projection {
    /// Keep only the listed fields.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(FieldPath::new).collect(),
            inclusive: true,
        }
    }

    /// Keep everything except the listed fields.
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(FieldPath::new).collect(),
            inclusive: false,
        }
    }

    /// Returns true when the projection needs the full document rather
    /// than a covered field set (any exclusion projection does).
    pub fn requires_document(&self) -> bool {
        !self.inclusive
    }

    /// Fields the projection needs from its input. Meaningful for
    /// inclusion projections; exclusions require the document anyway.
    pub fn required_fields(&self) -> &[FieldPath] {
        if self.inclusive { &self.fields } else { &[] }
    }

    /// Returns true if `path` survives the projection.
    pub fn retains(&self, path: &FieldPath) -> bool {
        let listed = self.fields.contains(path);
        if self.inclusive { listed } else { !listed }
    }
}

/// A query as handed to the planner: the numbered predicate tree plus the
/// request's shaping and planning directives.
#[derive(Debug, Clone)]
pub struct Query {
    ns: Namespace,
    root: MatchExpr,
    filter_data: serde_json::Value,
    sort: Option<KeyPattern>,
    projection: Option<Projection>,
    skip: u64,
    limit: Option<u64>,
    tailable: bool,
    hint: Option<KeyPattern>,
    snapshot: bool,
}

impl Query {
    /// Parses a filter document and numbers the resulting tree. The source
    /// document is kept owned so solutions can hold onto it.
    pub fn parse(
        ns: impl Into<Namespace>,
        filter: serde_json::Value,
    ) -> Result<Self, MatchParseError> {
        let mut root = parse_filter(&filter)?;
        root.number();
        Ok(Self {
            ns: ns.into(),
            root,
            filter_data: filter,
            sort: None,
            projection: None,
            skip: 0,
            limit: None,
            tailable: false,
            hint: None,
            snapshot: false,
        })
    }

    /// Builds a query from an already-constructed expression tree.
    pub fn from_expr(ns: impl Into<Namespace>, mut root: MatchExpr) -> Self {
        root.number();
        Self {
            ns: ns.into(),
            root,
            filter_data: serde_json::Value::Null,
            sort: None,
            projection: None,
            skip: 0,
            limit: None,
            tailable: false,
            hint: None,
            snapshot: false,
        }
    }

    pub fn with_sort(mut self, sort: KeyPattern) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_tailable(mut self, tailable: bool) -> Self {
        self.tailable = tailable;
        self
    }

    pub fn with_hint(mut self, hint: KeyPattern) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn ns(&self) -> &Namespace {
        &self.ns
    }

    pub fn root(&self) -> &MatchExpr {
        &self.root
    }

    /// The owned source document the filter was parsed from.
    pub fn filter_data(&self) -> &serde_json::Value {
        &self.filter_data
    }

    pub fn sort(&self) -> Option<&KeyPattern> {
        self.sort.as_ref()
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_tailable(&self) -> bool {
        self.tailable
    }

    pub fn hint(&self) -> Option<&KeyPattern> {
        self.hint.as_ref()
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_numbers_the_tree_and_keeps_the_source() {
        let query = Query::parse("db.users", json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(query.root().id().get(), 0);
        assert_eq!(query.filter_data(), &json!({"a": 1, "b": 2}));
    }

    #[test]
    fn inclusion_projection_lists_required_fields() {
        let proj = Projection::include(["a", "b"]);
        assert!(!proj.requires_document());
        assert_eq!(proj.required_fields().len(), 2);
        assert!(proj.retains(&FieldPath::from("a")));
        assert!(!proj.retains(&FieldPath::from("c")));
    }

    #[test]
    fn exclusion_projection_requires_the_document() {
        let proj = Projection::exclude(["secret"]);
        assert!(proj.requires_document());
        assert!(proj.required_fields().is_empty());
        assert!(!proj.retains(&FieldPath::from("secret")));
        assert!(proj.retains(&FieldPath::from("a")));
    }
}
