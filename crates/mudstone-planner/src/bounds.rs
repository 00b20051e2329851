//! Index bounds: translating predicate leaves into key intervals.
//!
//! The translation is type-bracketed: a range comparison only admits values
//! of the operand's type class, so `$gt: 3` produces `(3, +inf]` rather
//! than `(3, MaxKey]`. A translation also reports whether it is exact: an
//! exact translation fully answers the predicate, an inexact one is a
//! superset that requires a residual filter after fetching.
//!
//! Lists are always built in ascending value order; [`IndexBounds::orient`]
//! reverses the lists of descending key components when a scan is
//! finalized.

use std::fmt::{self, Display};

use mudstone_match::{CompareOp, MatchExpr, MatchKind};
use mudstone_types::{Direction, FieldPath, KeyPattern, TypeClass, Value};

use crate::interval::{Interval, OrderedIntervalList};

/// A whole-compound-key range, used as a shortcut instead of per-field
/// interval lists when a scan covers one contiguous key range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleRange {
    pub start_key: Vec<Value>,
    pub end_key: Vec<Value>,
    pub end_inclusive: bool,
}

/// Bounds for every key component of one index, in key-pattern order.
///
/// Components beyond those explicitly constrained default to the all-values
/// interval; the vector never exceeds the key pattern length. A scan over
/// one contiguous range of the whole compound key may additionally carry
/// the [`SimpleRange`] shortcut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBounds {
    pub fields: Vec<OrderedIntervalList>,
    pub simple_range: Option<SimpleRange>,
}

impl IndexBounds {
    /// Unconstrained bounds over every component of `pattern`.
    pub fn all_values(pattern: &KeyPattern) -> Self {
        Self {
            fields: pattern
                .iter()
                .map(|(field, _)| OrderedIntervalList::all_values(field.clone()))
                .collect(),
            simple_range: None,
        }
    }

    /// The full scan of every key, expressed as one simple range.
    pub fn whole_range(pattern: &KeyPattern) -> Self {
        let mut bounds = Self::all_values(pattern);
        bounds.simple_range = Some(SimpleRange {
            start_key: pattern.iter().map(|_| Value::MinKey).collect(),
            end_key: pattern.iter().map(|_| Value::MaxKey).collect(),
            end_inclusive: true,
        });
        bounds
    }

    /// Returns true when every component is unconstrained.
    pub fn is_all_values(&self) -> bool {
        self.fields.iter().all(OrderedIntervalList::is_all_values)
    }

    pub fn field(&self, pos: usize) -> &OrderedIntervalList {
        &self.fields[pos]
    }

    /// Reverses the interval lists of descending key components.
    ///
    /// Called once when a scan is finalized; merge operations before that
    /// point rely on ascending order.
    pub fn orient(&mut self, pattern: &KeyPattern) {
        for (pos, (_, direction)) in pattern.iter().enumerate() {
            if *direction == Direction::Descending {
                self.fields[pos] = self.fields[pos].reversed();
            }
        }
    }
}

impl Display for IndexBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(range) = &self.simple_range {
            let close = if range.end_inclusive { ']' } else { ')' };
            write!(f, "[")?;
            for (i, v) in range.start_key.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            write!(f, " .. ")?;
            for (i, v) in range.end_key.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            return write!(f, "{close}");
        }
        for (i, list) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{list}")?;
        }
        Ok(())
    }
}

/// Lower boundary of a type class.
fn class_lower(class: TypeClass) -> Value {
    match class {
        TypeClass::MinKey => Value::MinKey,
        TypeClass::Null => Value::Null,
        TypeClass::Numeric => Value::Double(f64::NEG_INFINITY),
        TypeClass::Text => Value::Text(String::new()),
        TypeClass::Object => Value::Object(Vec::new()),
        TypeClass::Array => Value::Array(Vec::new()),
        TypeClass::Bytes => Value::Bytes(bytes::Bytes::new()),
        TypeClass::Bool => Value::Bool(false),
        TypeClass::MaxKey => Value::MaxKey,
    }
}

/// Upper boundary of a type class, with its inclusivity.
///
/// Classes without a greatest element borrow the next class's least value
/// as an exclusive endpoint.
fn class_upper(class: TypeClass) -> (Value, bool) {
    match class {
        TypeClass::MinKey => (Value::MinKey, true),
        TypeClass::Null => (Value::Null, true),
        TypeClass::Numeric => (Value::Double(f64::INFINITY), true),
        TypeClass::Text => (Value::Object(Vec::new()), false),
        TypeClass::Object => (Value::Array(Vec::new()), false),
        TypeClass::Array => (Value::Bytes(bytes::Bytes::new()), false),
        TypeClass::Bytes => (Value::Bool(false), false),
        TypeClass::Bool => (Value::Bool(true), true),
        TypeClass::MaxKey => (Value::MaxKey, true),
    }
}

/// Translates one leaf predicate into the interval list it admits for its
/// own field, plus whether that list is exact.
///
/// `multikey` is the owning index's multikey flag: bounds over multikey
/// indexes are never exact because index keys are per-element.
///
/// # Panics
///
/// Panics when called with a logical or geo-near node; those are never
/// translatable and callers dispatch before translating.
pub fn translate(leaf: &MatchExpr, multikey: bool) -> (OrderedIntervalList, bool) {
    match leaf.kind() {
        MatchKind::Compare(cmp) => match cmp.op {
            CompareOp::Eq => translate_equality(&cmp.path, &cmp.value, multikey),
            CompareOp::In => {
                let elems = cmp
                    .value
                    .as_array()
                    .expect("$in operand is always an array");
                let mut list = OrderedIntervalList::new(cmp.path.clone(), Vec::new());
                let mut exact = !multikey;
                for elem in elems {
                    let (elem_list, elem_exact) = translate_equality(&cmp.path, elem, multikey);
                    exact &= elem_exact;
                    list.join_or(&elem_list);
                }
                (list, exact)
            }
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                translate_range(&cmp.path, cmp.op, &cmp.value, multikey)
            }
        },
        // Array leaves scan everything and filter after the fetch.
        MatchKind::ElemMatch(em) => (OrderedIntervalList::all_values(em.path.clone()), false),
        _ => unreachable!("bounds translation requires a comparison or array leaf"),
    }
}

fn translate_equality(
    path: &FieldPath,
    value: &Value,
    multikey: bool,
) -> (OrderedIntervalList, bool) {
    match value {
        Value::Array(elems) => {
            // Index keys for an array document are its elements, so
            // equality-to-array scans the first element's point plus the
            // whole-array point and filters the rest after fetching.
            let mut points = Vec::new();
            if let Some(first) = elems.first() {
                points.push(Interval::point(first.clone()));
            }
            points.push(Interval::point(value.clone()));
            let mut list = OrderedIntervalList::new(path.clone(), Vec::new());
            list.join_or(&OrderedIntervalList::new(path.clone(), points));
            (list, false)
        }
        Value::Null => (
            OrderedIntervalList::new(path.clone(), vec![Interval::point(Value::Null)]),
            false,
        ),
        _ => (
            OrderedIntervalList::new(path.clone(), vec![Interval::point(value.clone())]),
            !multikey,
        ),
    }
}

fn translate_range(
    path: &FieldPath,
    op: CompareOp,
    value: &Value,
    multikey: bool,
) -> (OrderedIntervalList, bool) {
    let sentinel = matches!(value, Value::MinKey | Value::MaxKey);
    let class = value.type_class();

    let interval = match op {
        CompareOp::Gt | CompareOp::Gte => {
            let (end, end_inclusive) = if sentinel {
                (Value::MaxKey, true)
            } else {
                class_upper(class)
            };
            Interval::new(value.clone(), end, op == CompareOp::Gte, end_inclusive)
        }
        CompareOp::Lt | CompareOp::Lte => {
            let start = if sentinel {
                Value::MinKey
            } else {
                class_lower(class)
            };
            Interval::new(start, value.clone(), true, op == CompareOp::Lte)
        }
        _ => unreachable!("range translation handles inequality operators only"),
    };

    let exact = match class {
        TypeClass::Array | TypeClass::Object | TypeClass::Null => false,
        _ => !multikey,
    };

    let intervals = if interval.is_empty() {
        Vec::new()
    } else {
        vec![interval]
    };
    (OrderedIntervalList::new(path.clone(), intervals), exact)
}

/// Computes the index bounds a predicate tree implies for one key pattern.
///
/// This is a reusable, side-effect-free entry point: AND contexts intersect
/// the per-field translations, OR roots union per-branch bounds field by
/// field, and any branch leaving a field unconstrained widens that field to
/// all values.
pub fn index_bounds_for_query(pattern: &KeyPattern, root: &MatchExpr) -> IndexBounds {
    let mut bounds = match root.kind() {
        MatchKind::Or(children) => {
            let mut merged: Option<IndexBounds> = None;
            for child in children {
                let branch = branch_bounds(pattern, child);
                match &mut merged {
                    None => merged = Some(branch),
                    Some(acc) => {
                        for (pos, list) in branch.fields.iter().enumerate() {
                            acc.fields[pos].join_or(list);
                        }
                    }
                }
            }
            merged.unwrap_or_else(|| IndexBounds::all_values(pattern))
        }
        _ => branch_bounds(pattern, root),
    };
    bounds.orient(pattern);
    bounds
}

/// Bounds of one AND context (or a bare leaf) over `pattern`.
fn branch_bounds(pattern: &KeyPattern, expr: &MatchExpr) -> IndexBounds {
    let mut bounds = IndexBounds::all_values(pattern);
    let mut leaves = Vec::new();
    gather_and_leaves(expr, &mut leaves);
    for leaf in leaves {
        let Some(path) = leaf.path() else { continue };
        if let Some(pos) = pattern.position_of(path) {
            let (list, _) = translate(leaf, false);
            bounds.fields[pos].join_and(&list);
        }
    }
    bounds
}

/// Collects the comparison/array leaves reachable through nested ANDs.
///
/// Nested ORs and negations contribute no per-field constraint here; their
/// fields stay at all values, which is a correct superset.
fn gather_and_leaves<'a>(expr: &'a MatchExpr, out: &mut Vec<&'a MatchExpr>) {
    match expr.kind() {
        MatchKind::And(children) => {
            for child in children {
                gather_and_leaves(child, out);
            }
        }
        MatchKind::Compare(_) | MatchKind::ElemMatch(_) => out.push(expr),
        MatchKind::Or(_) | MatchKind::Nor(_) | MatchKind::Not(_) | MatchKind::GeoNear(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudstone_match::parse_filter;
    use serde_json::json;

    fn pattern(json: serde_json::Value) -> KeyPattern {
        KeyPattern::from_json(&json).unwrap()
    }

    fn parse(json: serde_json::Value) -> MatchExpr {
        let mut expr = parse_filter(&json).unwrap();
        expr.number();
        expr
    }

    #[test]
    fn numeric_range_uses_infinity_endpoints() {
        let expr = parse(json!({"a": {"$gt": 3}}));
        let (list, exact) = translate(&expr, false);
        assert!(exact);
        assert_eq!(
            list.intervals,
            vec![Interval::new(
                Value::Int(3),
                Value::Double(f64::INFINITY),
                false,
                true
            )]
        );
    }

    #[test]
    fn text_range_is_bracketed_below_objects() {
        let expr = parse(json!({"a": {"$gte": "m"}}));
        let (list, exact) = translate(&expr, false);
        assert!(exact);
        assert_eq!(
            list.intervals,
            vec![Interval::new(
                Value::Text("m".into()),
                Value::Object(Vec::new()),
                true,
                false
            )]
        );
    }

    #[test]
    fn impossible_range_translates_to_no_intervals() {
        let expr = parse(json!({"a": {"$gt": true}}));
        let (list, _) = translate(&expr, false);
        assert!(list.is_empty());
    }

    #[test]
    fn equality_to_scalar_is_an_exact_point() {
        let expr = parse(json!({"a": 7}));
        let (list, exact) = translate(&expr, false);
        assert!(exact);
        assert!(list.is_point());
    }

    #[test]
    fn equality_on_multikey_index_is_inexact() {
        let expr = parse(json!({"a": 7}));
        let (_, exact) = translate(&expr, true);
        assert!(!exact);
    }

    #[test]
    fn equality_to_null_needs_a_residual_filter() {
        let expr = parse(json!({"a": null}));
        let (list, exact) = translate(&expr, false);
        assert!(!exact);
        assert!(list.is_point());
    }

    #[test]
    fn array_equality_yields_first_element_and_whole_array_points() {
        let expr = parse(json!({"a": [1, 2, 3]}));
        let (list, exact) = translate(&expr, false);
        assert!(!exact);
        assert_eq!(
            list.intervals,
            vec![
                Interval::point(Value::Int(1)),
                Interval::point(Value::Array(vec![
                    Value::Int(1),
                    Value::Int(2),
                    Value::Int(3)
                ])),
            ]
        );
    }

    #[test]
    fn in_list_unions_points() {
        let expr = parse(json!({"a": {"$in": [5, 1, 5, 9]}}));
        let (list, exact) = translate(&expr, false);
        assert!(exact);
        assert_eq!(
            list.intervals,
            vec![
                Interval::point(Value::Int(1)),
                Interval::point(Value::Int(5)),
                Interval::point(Value::Int(9)),
            ]
        );
    }

    #[test]
    fn or_branches_union_per_field() {
        // {$or: [{a: {$gt: 2, $lt: 10}}, {a: {$gt: 0, $lt: 15}}, {a: {$gt: 20}}]}
        // against {a: 1} gives exactly (0, 15), (20, +inf].
        let expr = parse(json!({"$or": [
            {"a": {"$gt": 2, "$lt": 10}},
            {"a": {"$gt": 0, "$lt": 15}},
            {"a": {"$gt": 20}}
        ]}));
        let bounds = index_bounds_for_query(&pattern(json!({"a": 1})), &expr);
        assert_eq!(
            bounds.field(0).intervals,
            vec![
                Interval::new(Value::Int(0), Value::Int(15), false, false),
                Interval::new(Value::Int(20), Value::Double(f64::INFINITY), false, true),
            ]
        );
    }

    #[test]
    fn unconstrained_or_branch_widens_to_all_values() {
        // {$or: [{a: {$gt: 1, $lt: 5}, c: 6},
        //        {a: 3, b: {$gt: 1, $lt: 2}, c: {$gt: 0, $lt: 10}}]}
        // against {a: 1, b: 1}: a = (1, 5), b = [MinKey, MaxKey].
        let expr = parse(json!({"$or": [
            {"a": {"$gt": 1, "$lt": 5}, "c": 6},
            {"a": 3, "b": {"$gt": 1, "$lt": 2}, "c": {"$gt": 0, "$lt": 10}}
        ]}));
        let bounds = index_bounds_for_query(&pattern(json!({"a": 1, "b": 1})), &expr);
        assert_eq!(
            bounds.field(0).intervals,
            vec![Interval::new(Value::Int(1), Value::Int(5), false, false)]
        );
        assert!(bounds.field(1).is_all_values());
    }

    #[test]
    fn and_context_intersects_per_field() {
        let expr = parse(json!({"a": {"$gt": 2, "$lt": 9}, "b": {"$lte": 4}}));
        let bounds = index_bounds_for_query(&pattern(json!({"a": 1, "b": 1})), &expr);
        assert_eq!(bounds.field(0).intervals.len(), 1);
        let a = &bounds.field(0).intervals[0];
        assert_eq!((a.start.clone(), a.end.clone()), (Value::Int(2), Value::Int(9)));
    }

    #[test]
    fn descending_components_reverse_interval_order() {
        let expr = parse(json!({"a": {"$in": [1, 5]}}));
        let bounds = index_bounds_for_query(&pattern(json!({"a": -1})), &expr);
        assert_eq!(
            bounds.field(0).intervals,
            vec![Interval::point(Value::Int(5)), Interval::point(Value::Int(1))]
        );
    }
}
