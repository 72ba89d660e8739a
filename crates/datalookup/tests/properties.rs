//! Algebraic properties of record sets, checked with generated documents.

use datalookup::{FilterValue, Filters, RecordSet};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-50i64..50).prop_map(Value::from),
        "[a-c]{0,3}".prop_map(Value::from),
    ]
}

fn object<S: Strategy<Value = Value>>(values: S, size: std::ops::Range<usize>) -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]{1,2}", values, size)
        .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>()))
}

fn nested() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            object(inner, 0..3),
        ]
    })
}

/// A record with an integer `id` plus a few arbitrary fields.
fn record() -> impl Strategy<Value = Value> {
    (0i64..5, object(nested(), 0..3)).prop_map(|(id, mut extra)| {
        if let Value::Object(map) = &mut extra {
            map.insert("id".to_string(), json!(id));
        }
        extra
    })
}

fn document() -> impl Strategy<Value = Value> {
    prop::collection::vec(record(), 0..6).prop_map(Value::Array)
}

proptest! {
    #[test]
    fn values_round_trip(raw in document()) {
        let set = RecordSet::new(raw.clone()).unwrap();
        prop_assert_eq!(set.values(), raw);
    }

    #[test]
    fn empty_filter_is_identity(raw in document()) {
        let set = RecordSet::new(raw).unwrap();
        prop_assert_eq!(set.filter_by(&Filters::new()).unwrap(), set);
    }

    #[test]
    fn distinct_is_idempotent(raw in document()) {
        let set = RecordSet::new(raw).unwrap();
        let once = set.distinct();
        prop_assert_eq!(once.distinct().len(), once.len());
        prop_assert_eq!(once.distinct(), once.clone());
        prop_assert_eq!(once, set);
    }

    #[test]
    fn union_is_commutative_and_idempotent(a in document(), b in document()) {
        let a = RecordSet::new(a).unwrap();
        let b = RecordSet::new(b).unwrap();
        prop_assert_eq!(&a | &b, &b | &a);
        prop_assert_eq!(&a | &a, a.clone());
        prop_assert_eq!((&a | &a).len(), a.distinct().len());
    }

    #[test]
    fn filter_and_exclude_partition(raw in document(), bound in 0i64..6) {
        let set = RecordSet::new(raw).unwrap();
        let filters = Filters::new().with("id__lt", FilterValue::from(bound));
        let kept = set.filter_by(&filters).unwrap();
        let dropped = set.exclude_by(&filters).unwrap();

        prop_assert_eq!(kept.len() + dropped.len(), set.len());
        prop_assert_eq!(&kept | &dropped, set);
        prop_assert!(dropped.iter().all(|record| !kept.contains(record)));
    }

    #[test]
    fn equality_ignores_order(raw in document()) {
        let set = RecordSet::new(raw.clone()).unwrap();
        let mut reversed = raw.as_array().cloned().unwrap_or_default();
        reversed.reverse();
        prop_assert_eq!(RecordSet::new(Value::Array(reversed)).unwrap(), set);
    }
}

#[test]
fn test_longest_match_prefers_nested_path() {
    // `a__b` reaches the nested `b`, not a lookup named `b` on `a`
    let set = RecordSet::new(json!([{"a": {"b": 1}}, {"a": {"b": 2}}])).unwrap();
    let found = set.filter([("a__b", 1)]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value_of("a").unwrap(), json!({"b": 1}));

    let found = set.filter([("a__b__gte", 1)]).unwrap();
    assert_eq!(found.len(), 2);
}
