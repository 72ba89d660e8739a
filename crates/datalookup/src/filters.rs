//! Filter values and ordered filter sets.

use crate::error::json_type_name;
use crate::record::Record;
use crate::record_set::RecordSet;
use serde_json::Value;
use std::fmt;

/// Value a record field is compared against.
///
/// Most lookups take plain JSON. Related lookups (`in`, `exact` on a record
/// collection) may also be given a [`RecordSet`], typically the result of a
/// previous query.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Json(Value),
    Records(RecordSet),
}

impl FilterValue {
    /// Borrow the JSON payload, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FilterValue::Json(value) => Some(value),
            FilterValue::Records(_) => None,
        }
    }

    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FilterValue::Json(value) => json_type_name(value),
            FilterValue::Records(_) => "record set",
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Json(value) => write!(f, "{value}"),
            FilterValue::Records(records) => write!(f, "{records}"),
        }
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::Json(value)
    }
}

impl From<RecordSet> for FilterValue {
    fn from(records: RecordSet) -> Self {
        FilterValue::Records(records)
    }
}

impl From<Record> for FilterValue {
    fn from(record: Record) -> Self {
        FilterValue::Records(RecordSet::from_records(vec![record]))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Json(Value::String(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Json(Value::Bool(value))
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Json(Value::from(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Json(Value::from(value))
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        FilterValue::Json(Value::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Json(Value::from(value))
    }
}

/// A half-open range `(lo, hi)` for the `range` lookup.
impl From<(i64, i64)> for FilterValue {
    fn from((lo, hi): (i64, i64)) -> Self {
        FilterValue::Json(Value::Array(vec![Value::from(lo), Value::from(hi)]))
    }
}

impl<T: Into<Value>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::Json(Value::Array(values.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for FilterValue {
    fn from(values: [T; N]) -> Self {
        FilterValue::Json(Value::Array(values.into_iter().map(Into::into).collect()))
    }
}

/// Filter value types a lookup can declare as accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    String,
    Bool,
    Integer,
    Number,
    List,
    Records,
}

impl FilterType {
    /// Check whether a filter value belongs to this type.
    pub fn accepts(&self, value: &FilterValue) -> bool {
        match (self, value) {
            (FilterType::Records, FilterValue::Records(_)) => true,
            (_, FilterValue::Records(_)) => false,
            (FilterType::String, FilterValue::Json(v)) => v.is_string(),
            (FilterType::Bool, FilterValue::Json(v)) => v.is_boolean(),
            (FilterType::Integer, FilterValue::Json(v)) => v.is_i64() || v.is_u64(),
            (FilterType::Number, FilterValue::Json(v)) => v.is_number(),
            (FilterType::List, FilterValue::Json(v)) => v.is_array(),
            (FilterType::Records, FilterValue::Json(_)) => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterType::String => "string",
            FilterType::Bool => "bool",
            FilterType::Integer => "integer",
            FilterType::Number => "number",
            FilterType::List => "list",
            FilterType::Records => "record set",
        }
    }
}

/// Ordered set of `key=value` filters, the equivalent of keyword arguments.
///
/// Keys are unique: pushing a key twice replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (key, value) in iter {
            filters.push(key, value);
        }
        filters
    }
}
