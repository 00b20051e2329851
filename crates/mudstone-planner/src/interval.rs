//! Interval algebra over index-key values.
//!
//! An [`Interval`] is one contiguous range of values for a single index
//! field; an [`OrderedIntervalList`] is the full set of ranges a predicate
//! admits for that field, kept sorted and non-overlapping. AND-merges
//! intersect lists, OR-merges union them, and boundary inclusivity decides
//! whether touching intervals coalesce.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use mudstone_types::{FieldPath, Value};

/// Relationship between two intervals, as seen from `self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalComparison {
    /// Identical endpoints and inclusivity.
    Equals,
    /// `self` strictly contains `other`.
    Contains,
    /// `self` lies strictly within `other`.
    Within,
    /// `self` starts first and the two overlap.
    OverlapsBefore,
    /// `self` starts later and the two overlap.
    OverlapsAfter,
    /// `self` ends before `other` starts, with a gap between them.
    Precedes,
    /// `self` ends exactly where `other` starts and exactly one side is
    /// inclusive: no shared point, but the union is contiguous.
    PrecedesCouldUnion,
    /// `self` starts after `other` ends.
    Succeeds,
}

/// One contiguous range of values with endpoint inclusivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: Value,
    pub end: Value,
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

/// Compares two lower bounds; `Less` means the first starts earlier.
fn cmp_lower(a: &Value, a_inclusive: bool, b: &Value, b_inclusive: bool) -> Ordering {
    match a.cmp(b) {
        Ordering::Equal => match (a_inclusive, b_inclusive) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        },
        other => other,
    }
}

/// Compares two upper bounds; `Greater` means the first extends further.
fn cmp_upper(a: &Value, a_inclusive: bool, b: &Value, b_inclusive: bool) -> Ordering {
    match a.cmp(b) {
        Ordering::Equal => match (a_inclusive, b_inclusive) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        },
        other => other,
    }
}

impl Interval {
    pub fn new(start: Value, end: Value, start_inclusive: bool, end_inclusive: bool) -> Self {
        Self {
            start,
            end,
            start_inclusive,
            end_inclusive,
        }
    }

    /// The single-value interval `[v, v]`.
    pub fn point(value: Value) -> Self {
        Self {
            start: value.clone(),
            end: value,
            start_inclusive: true,
            end_inclusive: true,
        }
    }

    /// The all-values interval `[MinKey, MaxKey]`.
    pub fn full() -> Self {
        Self {
            start: Value::MinKey,
            end: Value::MaxKey,
            start_inclusive: true,
            end_inclusive: true,
        }
    }

    /// Returns true if the interval admits no value.
    pub fn is_empty(&self) -> bool {
        match self.start.cmp(&self.end) {
            Ordering::Greater => true,
            Ordering::Equal => !(self.start_inclusive && self.end_inclusive),
            Ordering::Less => false,
        }
    }

    /// Returns true if the interval admits exactly one value.
    pub fn is_point(&self) -> bool {
        self.start_inclusive && self.end_inclusive && self.start == self.end
    }

    /// Returns true if this is the all-values interval.
    pub fn is_full(&self) -> bool {
        self == &Self::full()
    }

    /// Classifies the relationship between `self` and `other`.
    pub fn compare(&self, other: &Interval) -> IntervalComparison {
        // Entirely before?
        match self.end.cmp(&other.start) {
            Ordering::Less => return IntervalComparison::Precedes,
            Ordering::Equal => match (self.end_inclusive, other.start_inclusive) {
                (true, true) => {} // share the boundary point; fall through
                (false, false) => return IntervalComparison::Precedes,
                _ => return IntervalComparison::PrecedesCouldUnion,
            },
            Ordering::Greater => {}
        }

        // Entirely after?
        match other.end.cmp(&self.start) {
            Ordering::Less => return IntervalComparison::Succeeds,
            Ordering::Equal => {
                if !(other.end_inclusive && self.start_inclusive) {
                    return IntervalComparison::Succeeds;
                }
            }
            Ordering::Greater => {}
        }

        let starts = cmp_lower(
            &self.start,
            self.start_inclusive,
            &other.start,
            other.start_inclusive,
        );
        let ends = cmp_upper(
            &self.end,
            self.end_inclusive,
            &other.end,
            other.end_inclusive,
        );

        match (starts, ends) {
            (Ordering::Equal, Ordering::Equal) => IntervalComparison::Equals,
            (Ordering::Less | Ordering::Equal, Ordering::Greater)
            | (Ordering::Less, Ordering::Equal) => IntervalComparison::Contains,
            (Ordering::Greater | Ordering::Equal, Ordering::Less)
            | (Ordering::Greater, Ordering::Equal) => IntervalComparison::Within,
            (Ordering::Less, Ordering::Less) => IntervalComparison::OverlapsBefore,
            (Ordering::Greater, Ordering::Greater) => IntervalComparison::OverlapsAfter,
        }
    }

    /// Mathematical intersection, or None when the intervals are disjoint.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        if matches!(
            self.compare(other),
            IntervalComparison::Precedes
                | IntervalComparison::PrecedesCouldUnion
                | IntervalComparison::Succeeds
        ) {
            return None;
        }

        let (start, start_inclusive) = if cmp_lower(
            &self.start,
            self.start_inclusive,
            &other.start,
            other.start_inclusive,
        ) == Ordering::Less
        {
            (other.start.clone(), other.start_inclusive)
        } else {
            (self.start.clone(), self.start_inclusive)
        };

        let (end, end_inclusive) = if cmp_upper(
            &self.end,
            self.end_inclusive,
            &other.end,
            other.end_inclusive,
        ) == Ordering::Greater
        {
            (other.end.clone(), other.end_inclusive)
        } else {
            (self.end.clone(), self.end_inclusive)
        };

        let result = Interval::new(start, end, start_inclusive, end_inclusive);
        if result.is_empty() { None } else { Some(result) }
    }

    /// Union of two overlapping or touching intervals.
    ///
    /// Callers must have established via [`Interval::compare`] that the two
    /// are not separated by a gap.
    pub fn combine(&self, other: &Interval) -> Interval {
        let (start, start_inclusive) = if cmp_lower(
            &self.start,
            self.start_inclusive,
            &other.start,
            other.start_inclusive,
        ) == Ordering::Greater
        {
            (other.start.clone(), other.start_inclusive)
        } else {
            (self.start.clone(), self.start_inclusive)
        };

        let (end, end_inclusive) = if cmp_upper(
            &self.end,
            self.end_inclusive,
            &other.end,
            other.end_inclusive,
        ) == Ordering::Less
        {
            (other.end.clone(), other.end_inclusive)
        } else {
            (self.end.clone(), self.end_inclusive)
        };

        Interval::new(start, end, start_inclusive, end_inclusive)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.start_inclusive { '[' } else { '(' };
        let close = if self.end_inclusive { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.start, self.end)
    }
}

/// The sorted, non-overlapping set of intervals a predicate admits for one
/// index field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedIntervalList {
    pub field: FieldPath,
    pub intervals: Vec<Interval>,
}

impl OrderedIntervalList {
    pub fn new(field: FieldPath, intervals: Vec<Interval>) -> Self {
        Self { field, intervals }
    }

    /// The unconstrained list: one all-values interval.
    pub fn all_values(field: FieldPath) -> Self {
        Self {
            field,
            intervals: vec![Interval::full()],
        }
    }

    /// Returns true if this list is the single all-values interval.
    pub fn is_all_values(&self) -> bool {
        self.intervals.len() == 1 && self.intervals[0].is_full()
    }

    /// Returns true if this list is a single point.
    pub fn is_point(&self) -> bool {
        self.intervals.len() == 1 && self.intervals[0].is_point()
    }

    /// Returns true if the list admits no value at all.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Intersects `other` into this list.
    ///
    /// The result holds every nonempty pairwise intersection, sorted and
    /// disjoint (intersections of two disjoint sorted lists cannot overlap).
    pub fn join_and(&mut self, other: &OrderedIntervalList) {
        let mut result = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                if let Some(hit) = a.intersect(b) {
                    result.push(hit);
                }
            }
        }
        result.sort_by(|a, b| cmp_lower(&a.start, a.start_inclusive, &b.start, b.start_inclusive));
        self.intervals = result;
    }

    /// Unions `other` into this list, coalescing overlapping or touching
    /// intervals and keeping disjoint ones as separate entries.
    pub fn join_or(&mut self, other: &OrderedIntervalList) {
        let mut all: Vec<Interval> = self
            .intervals
            .drain(..)
            .chain(other.intervals.iter().cloned())
            .filter(|iv| !iv.is_empty())
            .collect();
        all.sort_by(|a, b| cmp_lower(&a.start, a.start_inclusive, &b.start, b.start_inclusive));

        let mut merged: Vec<Interval> = Vec::with_capacity(all.len());
        for next in all {
            match merged.last_mut() {
                Some(current) if current.compare(&next) != IntervalComparison::Precedes => {
                    *current = current.combine(&next);
                }
                _ => merged.push(next),
            }
        }
        self.intervals = merged;
    }

    /// Returns the list with interval order and endpoints reversed, for
    /// descending key components.
    pub fn reversed(&self) -> Self {
        Self {
            field: self.field.clone(),
            intervals: self
                .intervals
                .iter()
                .rev()
                .map(|iv| {
                    Interval::new(
                        iv.end.clone(),
                        iv.start.clone(),
                        iv.end_inclusive,
                        iv.start_inclusive,
                    )
                })
                .collect(),
        }
    }
}

impl Display for OrderedIntervalList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.field)?;
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{iv}")?;
        }
        Ok(())
    }
}
