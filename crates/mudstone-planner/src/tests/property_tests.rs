//! Property-based tests using proptest.
//!
//! The interval algebra must behave like set algebra on the underlying
//! value space; these tests check membership against brute-force point
//! probes rather than trusting the structural merge.

use proptest::prelude::*;

use mudstone_match::MatchExpr;
use mudstone_types::{FieldPath, Value};

use crate::bounds::translate;
use crate::interval::{Interval, IntervalComparison, OrderedIntervalList};

fn arb_interval() -> impl Strategy<Value = Interval> {
    (0i64..30, 0i64..30, any::<bool>(), any::<bool>())
        .prop_map(|(a, b, start_inclusive, end_inclusive)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Interval::new(Value::Int(lo), Value::Int(hi), start_inclusive, end_inclusive)
        })
        .prop_filter("interval must be nonempty", |iv| !iv.is_empty())
}

/// A normalized list: arbitrary intervals folded through the union merge.
fn arb_list() -> impl Strategy<Value = OrderedIntervalList> {
    prop::collection::vec(arb_interval(), 0..5).prop_map(|intervals| {
        let mut list = OrderedIntervalList::new(FieldPath::from("a"), Vec::new());
        list.join_or(&OrderedIntervalList::new(FieldPath::from("a"), intervals));
        list
    })
}

/// Point-probe membership, computed directly from the endpoints.
fn contains(list: &OrderedIntervalList, v: i64) -> bool {
    let v = Value::Int(v);
    list.intervals.iter().any(|iv| {
        let above_start = match iv.start.cmp(&v) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => iv.start_inclusive,
            std::cmp::Ordering::Greater => false,
        };
        let below_end = match v.cmp(&iv.end) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => iv.end_inclusive,
            std::cmp::Ordering::Greater => false,
        };
        above_start && below_end
    })
}

/// Every adjacent pair in a merged list must be strictly separated.
fn assert_sorted_disjoint(list: &OrderedIntervalList) -> Result<(), TestCaseError> {
    for pair in list.intervals.windows(2) {
        prop_assert_eq!(
            pair[0].compare(&pair[1]),
            IntervalComparison::Precedes,
            "intervals {} and {} must be disjoint with a gap",
            &pair[0],
            &pair[1]
        );
    }
    Ok(())
}

proptest! {
    /// OR-merge is pointwise union.
    #[test]
    fn join_or_is_pointwise_union(a in arb_list(), b in arb_list()) {
        let mut merged = a.clone();
        merged.join_or(&b);
        for v in -1i64..=31 {
            prop_assert_eq!(
                contains(&merged, v),
                contains(&a, v) || contains(&b, v),
                "membership of {} after union", v
            );
        }
    }

    /// AND-merge is pointwise intersection.
    #[test]
    fn join_and_is_pointwise_intersection(a in arb_list(), b in arb_list()) {
        let mut merged = a.clone();
        merged.join_and(&b);
        for v in -1i64..=31 {
            prop_assert_eq!(
                contains(&merged, v),
                contains(&a, v) && contains(&b, v),
                "membership of {} after intersection", v
            );
        }
    }

    /// Merged lists stay sorted with strict gaps between entries.
    #[test]
    fn merges_preserve_the_list_invariant(a in arb_list(), b in arb_list()) {
        let mut unioned = a.clone();
        unioned.join_or(&b);
        assert_sorted_disjoint(&unioned)?;

        let mut intersected = a.clone();
        intersected.join_and(&b);
        assert_sorted_disjoint(&intersected)?;
    }

    /// Both merges are idempotent.
    #[test]
    fn merges_are_idempotent(a in arb_list()) {
        let mut unioned = a.clone();
        unioned.join_or(&a);
        prop_assert_eq!(&unioned, &a);

        let mut intersected = a.clone();
        intersected.join_and(&a);
        prop_assert_eq!(&intersected, &a);
    }

    /// Translated range bounds admit exactly the values the predicate
    /// matches.
    #[test]
    fn range_bounds_agree_with_evaluation(
        op_index in 0usize..4,
        operand in -10i64..10,
        probe in -12i64..12,
    ) {
        let mut leaf = match op_index {
            0 => MatchExpr::gt("a", operand),
            1 => MatchExpr::gte("a", operand),
            2 => MatchExpr::lt("a", operand),
            _ => MatchExpr::lte("a", operand),
        };
        leaf.number();

        let (list, exact) = translate(&leaf, false);
        prop_assert!(exact);

        let doc = serde_json::json!({ "a": probe });
        prop_assert_eq!(
            contains(&list, probe),
            leaf.matches(&doc),
            "bounds and evaluation disagree for probe {}", probe
        );
    }

    /// Equality bounds on scalars are the single matching point.
    #[test]
    fn equality_bounds_agree_with_evaluation(operand in -10i64..10, probe in -12i64..12) {
        let mut leaf = MatchExpr::eq("a", operand);
        leaf.number();

        let (list, exact) = translate(&leaf, false);
        prop_assert!(exact);
        prop_assert!(list.is_point());

        let doc = serde_json::json!({ "a": probe });
        prop_assert_eq!(contains(&list, probe), leaf.matches(&doc));
    }
}
