//! Lookups specific to array fields.
//!
//! Each array element is unwrapped to its stored value and compared with the
//! same loose equality `exact` uses. A plain string filter value is treated as
//! a one-element list, so `tag__contains="x"` reads naturally.

use super::matcher::field_equals_json;
use super::scalar::scalar_in;
use super::Lookup;
use crate::error::Result;
use crate::field::{Field, FieldValue};
use crate::filters::{FilterType, FilterValue};
use serde_json::Value;
use std::borrow::Cow;

fn wrap_string(value: &FilterValue) -> Cow<'_, FilterValue> {
    match value {
        FilterValue::Json(Value::String(s)) => Cow::Owned(FilterValue::Json(Value::Array(vec![
            Value::String(s.clone()),
        ]))),
        _ => Cow::Borrowed(value),
    }
}

fn elements_and_list<'a>(
    field: &'a FieldValue,
    filter: &'a FilterValue,
) -> Option<(&'a [Field], &'a [Value])> {
    match (field.as_array(), filter.as_json()) {
        (Some(items), Some(Value::Array(list))) => Some((items, list.as_slice())),
        _ => None,
    }
}

fn holds(items: &[Field], expected: &Value) -> bool {
    items
        .iter()
        .any(|item| field_equals_json(item.get_value(), expected))
}

/// Every supplied value is an element of the array.
pub struct ArrayContains;

impl Lookup for ArrayContains {
    fn lookup_name(&self) -> &str {
        "contains"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List]
    }

    fn prepare_filter_value<'a>(&self, value: &'a FilterValue) -> Cow<'a, FilterValue> {
        wrap_string(value)
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        Ok(elements_and_list(field, filter)
            .is_some_and(|(items, list)| list.iter().all(|expected| holds(items, expected))))
    }
}

/// Every array element is one of the supplied values.
pub struct ArrayContainedBy;

impl Lookup for ArrayContainedBy {
    fn lookup_name(&self) -> &str {
        "contained_by"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List]
    }

    fn prepare_filter_value<'a>(&self, value: &'a FilterValue) -> Cow<'a, FilterValue> {
        wrap_string(value)
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        Ok(elements_and_list(field, filter).is_some_and(|(items, list)| {
            items.iter().all(|item| {
                list.iter()
                    .any(|expected| field_equals_json(item.get_value(), expected))
            })
        }))
    }
}

/// At least one supplied value is an element of the array.
pub struct ArrayOverlap;

impl Lookup for ArrayOverlap {
    fn lookup_name(&self) -> &str {
        "overlap"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List]
    }

    fn prepare_filter_value<'a>(&self, value: &'a FilterValue) -> Cow<'a, FilterValue> {
        wrap_string(value)
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        Ok(elements_and_list(field, filter)
            .is_some_and(|(items, list)| list.iter().any(|expected| holds(items, expected))))
    }
}

/// Exact element count.
pub struct ArrayLength;

impl Lookup for ArrayLength {
    fn lookup_name(&self) -> &str {
        "len"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::Integer]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let expected = filter.as_json().and_then(Value::as_u64);
        Ok(match (field.as_array(), expected) {
            (Some(items), Some(expected)) => items.len() as u64 == expected,
            _ => false,
        })
    }
}

/// At least one array element passes the scalar `in` rule.
pub struct ArrayIn;

impl Lookup for ArrayIn {
    fn lookup_name(&self) -> &str {
        "in"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List, FilterType::String, FilterType::Records]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let Some(items) = field.as_array() else {
            return Ok(false);
        };
        for item in items {
            if scalar_in(item.get_value(), filter)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
