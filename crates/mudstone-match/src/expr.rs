//! Match-expression trees.
//!
//! A [`MatchExpr`] is a boolean expression over document fields: logical
//! nodes (`$and`, `$or`, `$nor`, `$not`) over comparison, array, and
//! geo-near leaves. The planner reads these trees but never mutates them;
//! per-candidate index assignments live in a side table keyed by [`NodeId`].

use std::fmt::{self, Display};

use mudstone_types::{FieldPath, Value};

/// Stable identity of one node within a numbered expression tree.
///
/// Ids are assigned by [`MatchExpr::number`] in pre-order and are unique
/// within one tree. Side tables (index tags, enumeration state) key on the
/// id so the shared tree itself stays immutable during planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Placeholder id carried by freshly constructed nodes.
    pub const UNSET: NodeId = NodeId(u32::MAX);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Comparison operator of a [`CompareExpr`] leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Membership in a list of values; the operand is always `Value::Array`.
    In,
}

impl CompareOp {
    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::In => "$in",
        }
    }
}

/// A single field comparison leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareExpr {
    pub path: FieldPath,
    pub op: CompareOp,
    pub value: Value,
}

/// An array leaf: the field must hold an array with an element satisfying
/// every child predicate. Child paths are relative to the element (and may
/// be empty for operator-only bodies such as `{$elemMatch: {$gt: 3}}`).
#[derive(Debug, Clone, PartialEq)]
pub struct ElemMatchExpr {
    pub path: FieldPath,
    pub children: Vec<MatchExpr>,
}

/// A geo-near leaf. Geo-near orders rather than filters, so evaluation
/// always accepts; its presence constrains planning instead.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNearExpr {
    pub path: FieldPath,
    pub point: (f64, f64),
    pub max_distance: Option<f64>,
}

/// The node-kind payload of a [`MatchExpr`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchKind {
    /// Conjunction. The empty conjunction is the match-all filter.
    And(Vec<MatchExpr>),
    Or(Vec<MatchExpr>),
    Nor(Vec<MatchExpr>),
    Not(Box<MatchExpr>),
    Compare(CompareExpr),
    ElemMatch(ElemMatchExpr),
    GeoNear(GeoNearExpr),
}

/// One node of a match-expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    id: NodeId,
    kind: MatchKind,
}

impl MatchExpr {
    fn unnumbered(kind: MatchKind) -> Self {
        Self {
            id: NodeId::UNSET,
            kind,
        }
    }

    pub fn and(children: Vec<MatchExpr>) -> Self {
        Self::unnumbered(MatchKind::And(children))
    }

    pub fn or(children: Vec<MatchExpr>) -> Self {
        assert!(!children.is_empty(), "$or requires at least one child");
        Self::unnumbered(MatchKind::Or(children))
    }

    pub fn nor(children: Vec<MatchExpr>) -> Self {
        assert!(!children.is_empty(), "$nor requires at least one child");
        Self::unnumbered(MatchKind::Nor(children))
    }

    pub fn not(child: MatchExpr) -> Self {
        Self::unnumbered(MatchKind::Not(Box::new(child)))
    }

    pub fn compare(path: impl Into<FieldPath>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::unnumbered(MatchKind::Compare(CompareExpr {
            path: path.into(),
            op,
            value: value.into(),
        }))
    }

    pub fn eq(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Eq, value)
    }

    pub fn gt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Gt, value)
    }

    pub fn gte(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Gte, value)
    }

    pub fn lt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Lt, value)
    }

    pub fn lte(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Lte, value)
    }

    pub fn in_list(path: impl Into<FieldPath>, values: Vec<Value>) -> Self {
        Self::compare(path, CompareOp::In, Value::Array(values))
    }

    pub fn elem_match(path: impl Into<FieldPath>, children: Vec<MatchExpr>) -> Self {
        assert!(
            !children.is_empty(),
            "$elemMatch requires at least one child"
        );
        Self::unnumbered(MatchKind::ElemMatch(ElemMatchExpr {
            path: path.into(),
            children,
        }))
    }

    pub fn near(path: impl Into<FieldPath>, point: (f64, f64), max_distance: Option<f64>) -> Self {
        Self::unnumbered(MatchKind::GeoNear(GeoNearExpr {
            path: path.into(),
            point,
            max_distance,
        }))
    }

    /// Assigns pre-order node ids to this tree, returning the node count.
    ///
    /// Must be called exactly once on a fully built tree before planning;
    /// side tables keyed by [`NodeId`] are only meaningful afterwards.
    pub fn number(&mut self) -> u32 {
        fn walk(expr: &mut MatchExpr, next: &mut u32) {
            expr.id = NodeId(*next);
            *next += 1;
            match &mut expr.kind {
                MatchKind::And(children) | MatchKind::Or(children) | MatchKind::Nor(children) => {
                    for child in children {
                        walk(child, next);
                    }
                }
                MatchKind::Not(child) => walk(child, next),
                MatchKind::ElemMatch(em) => {
                    for child in &mut em.children {
                        walk(child, next);
                    }
                }
                MatchKind::Compare(_) | MatchKind::GeoNear(_) => {}
            }
        }

        let mut next = 0;
        walk(self, &mut next);
        next
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &MatchKind {
        &self.kind
    }

    /// Returns the field path of a leaf node; logical nodes carry none.
    pub fn path(&self) -> Option<&FieldPath> {
        match &self.kind {
            MatchKind::Compare(c) => Some(&c.path),
            MatchKind::ElemMatch(em) => Some(&em.path),
            MatchKind::GeoNear(g) => Some(&g.path),
            _ => None,
        }
    }

    pub fn children(&self) -> &[MatchExpr] {
        match &self.kind {
            MatchKind::And(children) | MatchKind::Or(children) | MatchKind::Nor(children) => {
                children
            }
            MatchKind::Not(child) => std::slice::from_ref(child),
            MatchKind::Compare(_) | MatchKind::ElemMatch(_) | MatchKind::GeoNear(_) => &[],
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind,
            MatchKind::Compare(_) | MatchKind::ElemMatch(_) | MatchKind::GeoNear(_)
        )
    }

    pub fn is_logical(&self) -> bool {
        !self.is_leaf()
    }

    /// Visits every node in pre-order.
    pub fn walk(&self, visit: &mut impl FnMut(&MatchExpr)) {
        visit(self);
        match &self.kind {
            MatchKind::And(children) | MatchKind::Or(children) | MatchKind::Nor(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
            MatchKind::Not(child) => child.walk(visit),
            MatchKind::ElemMatch(em) => {
                for child in &em.children {
                    child.walk(visit);
                }
            }
            MatchKind::Compare(_) | MatchKind::GeoNear(_) => {}
        }
    }

    /// Returns true if any node in the tree is a geo-near leaf.
    pub fn has_geo_near(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if matches!(node.kind, MatchKind::GeoNear(_)) {
                found = true;
            }
        });
        found
    }

    /// Returns true if any node in the tree is `$not` or `$nor`.
    pub fn has_not_or_nor(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if matches!(node.kind, MatchKind::Not(_) | MatchKind::Nor(_)) {
                found = true;
            }
        });
        found
    }

    /// Evaluates this expression against a document.
    pub fn matches(&self, doc: &serde_json::Value) -> bool {
        match &self.kind {
            MatchKind::And(children) => children.iter().all(|c| c.matches(doc)),
            MatchKind::Or(children) => children.iter().any(|c| c.matches(doc)),
            MatchKind::Nor(children) => !children.iter().any(|c| c.matches(doc)),
            MatchKind::Not(child) => !child.matches(doc),
            MatchKind::Compare(cmp) => {
                let candidates = resolve_path(doc, cmp.path.as_str());
                candidates.iter().any(|v| compare_matches(cmp, v))
            }
            MatchKind::ElemMatch(em) => {
                let candidates = resolve_path(doc, em.path.as_str());
                candidates.iter().any(|v| match v {
                    serde_json::Value::Array(elems) => elems
                        .iter()
                        .any(|elem| em.children.iter().all(|c| c.matches(elem))),
                    _ => false,
                })
            }
            MatchKind::GeoNear(_) => true,
        }
    }
}

/// Resolves a dotted path against a document, branching through arrays.
///
/// Returns every value reachable by the path: traversing an array mid-path
/// descends into each element, matching multikey index semantics.
fn resolve_path<'a>(doc: &'a serde_json::Value, path: &str) -> Vec<&'a serde_json::Value> {
    if path.is_empty() {
        return vec![doc];
    }

    let mut current = vec![doc];
    for component in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                serde_json::Value::Object(map) => {
                    if let Some(v) = map.get(component) {
                        next.push(v);
                    }
                }
                serde_json::Value::Array(elems) => {
                    // Numeric components address a position; otherwise each
                    // element document is searched.
                    if let Ok(idx) = component.parse::<usize>() {
                        if let Some(v) = elems.get(idx) {
                            next.push(v);
                        }
                    }
                    for elem in elems {
                        if let serde_json::Value::Object(map) = elem {
                            if let Some(v) = map.get(component) {
                                next.push(v);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }
    current
}

fn compare_matches(cmp: &CompareExpr, candidate: &serde_json::Value) -> bool {
    let value = Value::from_json(candidate);
    if compare_value_matches(cmp, &value) {
        return true;
    }
    // A comparison on an array field matches when any element matches.
    if let Value::Array(elems) = &value {
        return elems.iter().any(|elem| compare_value_matches(cmp, elem));
    }
    false
}

fn compare_value_matches(cmp: &CompareExpr, value: &Value) -> bool {
    match cmp.op {
        CompareOp::Eq => value == &cmp.value,
        CompareOp::In => cmp
            .value
            .as_array()
            .is_some_and(|elems| elems.iter().any(|e| e == value)),
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
            // Range comparisons only apply within one type class.
            if value.type_class() != cmp.value.type_class() {
                return false;
            }
            match cmp.op {
                CompareOp::Gt => value > &cmp.value,
                CompareOp::Gte => value >= &cmp.value,
                CompareOp::Lt => value < &cmp.value,
                CompareOp::Lte => value <= &cmp.value,
                _ => unreachable!(),
            }
        }
    }
}

impl Display for MatchExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MatchKind::And(children) => write_logical(f, "$and", children),
            MatchKind::Or(children) => write_logical(f, "$or", children),
            MatchKind::Nor(children) => write_logical(f, "$nor", children),
            MatchKind::Not(child) => write!(f, "$not({child})"),
            MatchKind::Compare(c) => write!(f, "{} {} {}", c.path, c.op.name(), c.value),
            MatchKind::ElemMatch(em) => {
                write!(f, "{} $elemMatch(", em.path)?;
                for (i, child) in em.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            MatchKind::GeoNear(g) => {
                write!(f, "{} $near [{}, {}]", g.path, g.point.0, g.point.1)
            }
        }
    }
}

fn write_logical(f: &mut fmt::Formatter<'_>, name: &str, children: &[MatchExpr]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
