//! Comparison helpers shared by the lookup families.
//!
//! This module provides:
//! - `CaseInsensitive` - wraps a lookup and lower-cases both sides before matching
//! - Loose JSON equality (integers and floats compare by value)
//! - Ordering of scalars for the comparison lookups

use super::Lookup;
use crate::error::{json_type_name, DatalookupError, Result};
use crate::field::FieldValue;
use crate::filters::{FilterType, FilterValue};
use crate::record::Record;
use crate::record_set::RecordSet;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Case-insensitive variant of another lookup.
///
/// String filter and field values are lower-cased before the inner lookup
/// runs. Pattern lookups keep the filter value untouched so that regex
/// syntax is not altered.
pub struct CaseInsensitive<L> {
    name: &'static str,
    inner: L,
    lower_filter: bool,
}

impl<L: Lookup> CaseInsensitive<L> {
    pub fn new(name: &'static str, inner: L) -> Self {
        Self {
            name,
            inner,
            lower_filter: true,
        }
    }

    /// Lower-case only the field value.
    pub fn raw_pattern(name: &'static str, inner: L) -> Self {
        Self {
            name,
            inner,
            lower_filter: false,
        }
    }
}

impl<L: Lookup> Lookup for CaseInsensitive<L> {
    fn lookup_name(&self) -> &str {
        self.name
    }

    fn filter_types(&self) -> &[FilterType] {
        self.inner.filter_types()
    }

    fn prepare_filter_value<'a>(&self, value: &'a FilterValue) -> Cow<'a, FilterValue> {
        let value = self.inner.prepare_filter_value(value);
        if !self.lower_filter {
            return value;
        }
        let lowered = match value.as_ref() {
            FilterValue::Json(Value::String(s)) => Some(s.to_lowercase()),
            _ => None,
        };
        match lowered {
            Some(s) => Cow::Owned(FilterValue::Json(Value::String(s))),
            None => value,
        }
    }

    fn prepare_field_value<'a>(&self, value: &'a FieldValue) -> Cow<'a, FieldValue> {
        let value = self.inner.prepare_field_value(value);
        let lowered = match value.as_ref() {
            FieldValue::Scalar(Value::String(s)) => Some(s.to_lowercase()),
            _ => None,
        };
        match lowered {
            Some(s) => Cow::Owned(FieldValue::Scalar(Value::String(s))),
            None => value,
        }
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        self.inner.is_matching(field, filter)
    }
}

/// JSON equality where numbers compare by numeric value.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            x.as_f64() == y.as_f64()
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| loose_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Whether a stored field value equals a plain JSON value.
pub(crate) fn field_equals_json(field: &FieldValue, expected: &Value) -> bool {
    match field {
        FieldValue::Scalar(value) => loose_eq(value, expected),
        FieldValue::Array(items) => match expected {
            Value::Array(expected) => {
                items.len() == expected.len()
                    && items
                        .iter()
                        .zip(expected)
                        .all(|(item, e)| field_equals_json(item.get_value(), e))
            }
            _ => false,
        },
        FieldValue::Record(record) => Record::new(expected.clone())
            .map(|other| other == **record)
            .unwrap_or(false),
        FieldValue::Records(records) => RecordSet::new(expected.clone())
            .map(|other| other == *records)
            .unwrap_or(false),
    }
}

/// Whether a stored field value equals a filter value.
pub(crate) fn field_equals(field: &FieldValue, filter: &FilterValue) -> bool {
    match (field, filter) {
        (_, FilterValue::Json(expected)) => field_equals_json(field, expected),
        (FieldValue::Records(records), FilterValue::Records(expected)) => records == expected,
        _ => false,
    }
}

/// Order a field scalar against a filter scalar of a compatible type.
pub(crate) fn compare_scalars(lookup: &str, field: &Value, filter: &Value) -> Result<Ordering> {
    let ordering = match (field, filter) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64().zip(y.as_f64()).and_then(|(x, y)| x.partial_cmp(&y)),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    };
    ordering.ok_or_else(|| {
        DatalookupError::lookup_type(
            lookup,
            format!("a value comparable to {}", json_type_name(field)),
            json_type_name(filter),
        )
    })
}

/// Records a related filter value stands for.
///
/// JSON lists contribute their object elements; anything else is ignored.
pub(crate) fn filter_records(filter: &FilterValue) -> Vec<Cow<'_, Record>> {
    match filter {
        FilterValue::Records(records) => records.iter().map(Cow::Borrowed).collect(),
        FilterValue::Json(Value::Array(items)) => items
            .iter()
            .filter_map(|item| Record::new(item.clone()).ok())
            .map(Cow::Owned)
            .collect(),
        FilterValue::Json(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_eq_numbers() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!(0.55), &json!(0.55)));
        assert!(!loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!([1, {"a": 2}]), &json!([1.0, {"a": 2}])));
        assert!(!loose_eq(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn test_field_equals_json() {
        let array = FieldValue::Array(vec![
            crate::Field::classify("t", json!("x")).unwrap(),
            crate::Field::classify("t", json!("y")).unwrap(),
        ]);
        assert!(field_equals_json(&array, &json!(["x", "y"])));
        assert!(!field_equals_json(&array, &json!(["y", "x"])));

        let record = FieldValue::Record(Box::new(Record::new(json!({"a": 1, "b": 2})).unwrap()));
        assert!(field_equals_json(&record, &json!({"b": 2, "a": 1})));
        assert!(!field_equals_json(&record, &json!("a")));
    }

    #[test]
    fn test_compare_scalars() {
        assert_eq!(
            compare_scalars("gt", &json!(3), &json!(2)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            compare_scalars("lt", &json!(1.5), &json!(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare_scalars("gte", &json!("b"), &json!("a")).unwrap(),
            Ordering::Greater
        );
        assert!(matches!(
            compare_scalars("gt", &json!(1), &json!("x")),
            Err(DatalookupError::LookupType { .. })
        ));
        assert!(compare_scalars("gt", &json!(null), &json!(1)).is_err());
    }

    #[test]
    fn test_filter_records_from_json_list() {
        let filter = FilterValue::Json(json!([{"id": 1}, "skip", {"id": 2}]));
        assert_eq!(filter_records(&filter).len(), 2);
        assert!(filter_records(&FilterValue::from("x")).is_empty());
    }
}
