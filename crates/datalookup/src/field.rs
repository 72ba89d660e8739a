//! Field classification: every decoded value becomes one of four variants.

use crate::error::{json_type_name, DatalookupError, Result};
use crate::lookup::matcher::loose_eq;
use crate::lookup::LookupTarget;
use crate::path::LOOKUP_SEP;
use crate::record::Record;
use crate::record_set::RecordSet;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Typed content of a field.
///
/// Equality compares numbers by value, the same way `exact` does.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// A string, number, bool or null.
    Scalar(Value),
    /// A list that is not made only of objects. Elements are classified
    /// under the owning field's name.
    Array(Vec<Field>),
    /// A single embedded object.
    Record(Box<Record>),
    /// A list where every element is an object.
    Records(RecordSet),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Field]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&RecordSet> {
        match self {
            FieldValue::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Convert back to plain JSON.
    pub fn deserialize(&self) -> Value {
        match self {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::Array(items) => Value::Array(items.iter().map(Field::deserialize).collect()),
            FieldValue::Record(record) => record.values(),
            FieldValue::Records(records) => records.values(),
        }
    }

    /// Registry slot holding the lookups applicable to this variant.
    pub fn target(&self) -> LookupTarget {
        match self {
            FieldValue::Scalar(_) => LookupTarget::Scalar,
            FieldValue::Array(_) => LookupTarget::Array,
            FieldValue::Record(_) => LookupTarget::Record,
            FieldValue::Records(_) => LookupTarget::Records,
        }
    }

    /// Records reachable directly through this value.
    pub fn related_records(&self) -> Vec<&Record> {
        match self {
            FieldValue::Record(record) => vec![record.as_ref()],
            FieldValue::Records(records) => records.iter().collect(),
            FieldValue::Scalar(_) | FieldValue::Array(_) => Vec::new(),
        }
    }

    pub(crate) fn related_records_mut(&mut self) -> Vec<&mut Record> {
        match self {
            FieldValue::Record(record) => vec![record.as_mut()],
            FieldValue::Records(records) => records.iter_mut().collect(),
            FieldValue::Scalar(_) | FieldValue::Array(_) => Vec::new(),
        }
    }

    /// Structural hash. Containers combine their element hashes without
    /// regard to position.
    pub(crate) fn fingerprint(&self) -> u64 {
        match self {
            FieldValue::Scalar(value) => {
                let mut hasher = DefaultHasher::new();
                0u8.hash(&mut hasher);
                match value {
                    // Numbers equal under `loose_eq` share their f64 form
                    Value::Number(n) => {
                        let n = n.as_f64().unwrap_or(f64::NAN);
                        let n = if n == 0.0 { 0.0 } else { n };
                        n.to_bits().hash(&mut hasher);
                    }
                    _ => value.to_string().hash(&mut hasher),
                }
                hasher.finish()
            }
            FieldValue::Array(items) => {
                unordered_hash(1, items.iter().map(Field::fingerprint).collect())
            }
            FieldValue::Record(record) => unordered_hash(2, vec![record.fingerprint()]),
            FieldValue::Records(records) => unordered_hash(3, records.fingerprints()),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Scalar(a), FieldValue::Scalar(b)) => loose_eq(a, b),
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            (FieldValue::Record(a), FieldValue::Record(b)) => a == b,
            (FieldValue::Records(a), FieldValue::Records(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

/// Combine hashes independently of their order.
pub(crate) fn unordered_hash(tag: u8, mut hashes: Vec<u64>) -> u64 {
    hashes.sort_unstable();
    let mut hasher = DefaultHasher::new();
    tag.hash(&mut hasher);
    hashes.hash(&mut hasher);
    hasher.finish()
}

/// A named value inside a [`Record`].
///
/// The name is fixed at construction and may neither contain nor end with
/// the lookup separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    value: FieldValue,
}

impl Field {
    /// Classify a raw value: objects become nested records, lists of objects
    /// become record collections, other lists become arrays and everything
    /// else is a scalar.
    pub fn classify(name: impl Into<String>, raw: Value) -> Result<Self> {
        let name = checked_name(name.into())?;
        let value = classify_value(&name, raw)?;
        Ok(Field { name, value })
    }

    /// Build a scalar field, rejecting objects and lists.
    pub fn scalar(name: impl Into<String>, raw: Value) -> Result<Self> {
        let name = checked_name(name.into())?;
        let value = scalar_value(&name, raw)?;
        Ok(Field { name, value })
    }

    /// Build an array field from a list.
    pub fn array(name: impl Into<String>, raw: Value) -> Result<Self> {
        let name = checked_name(name.into())?;
        let value = array_value(&name, raw)?;
        Ok(Field { name, value })
    }

    /// Build a nested record field from an object.
    pub fn record(name: impl Into<String>, raw: Value) -> Result<Self> {
        let name = checked_name(name.into())?;
        let value = record_value(&name, raw)?;
        Ok(Field { name, value })
    }

    /// Build a record collection field from a list of objects.
    pub fn records(name: impl Into<String>, raw: Value) -> Result<Self> {
        let name = checked_name(name.into())?;
        let value = records_value(&name, raw)?;
        Ok(Field { name, value })
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_value(&self) -> &FieldValue {
        &self.value
    }

    /// Replace the value, validated against this field's variant.
    pub fn set_value(&mut self, raw: Value) -> Result<()> {
        self.value = match self.value {
            FieldValue::Scalar(_) => scalar_value(&self.name, raw)?,
            FieldValue::Array(_) => array_value(&self.name, raw)?,
            FieldValue::Record(_) => record_value(&self.name, raw)?,
            FieldValue::Records(_) => records_value(&self.name, raw)?,
        };
        Ok(())
    }

    /// Swap in an already-built value (cascading filters).
    pub(crate) fn replace_value(&mut self, value: FieldValue) {
        self.value = value;
    }

    pub(crate) fn value_mut(&mut self) -> &mut FieldValue {
        &mut self.value
    }

    pub fn deserialize(&self) -> Value {
        self.value.deserialize()
    }

    pub fn related_records(&self) -> Vec<&Record> {
        self.value.related_records()
    }

    /// True when at least one record is reachable through this field.
    pub fn has_records(&self) -> bool {
        !self.related_records().is_empty()
    }

    pub(crate) fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.value.fingerprint().hash(&mut hasher);
        hasher.finish()
    }
}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint());
    }
}

fn checked_name(name: String) -> Result<String> {
    if name.ends_with(LOOKUP_SEP) {
        return Err(DatalookupError::InvalidFieldName {
            name,
            reason: "field names must not end with the lookup separator",
        });
    }
    if name.contains(LOOKUP_SEP) {
        return Err(DatalookupError::InvalidFieldName {
            name,
            reason: "field names must not contain the lookup separator",
        });
    }
    Ok(name)
}

fn classify_value(name: &str, raw: Value) -> Result<FieldValue> {
    let all_objects = raw
        .as_array()
        .map(|items| items.iter().all(Value::is_object));
    match all_objects {
        Some(true) => records_value(name, raw),
        Some(false) => array_value(name, raw),
        None if raw.is_object() => record_value(name, raw),
        None => scalar_value(name, raw),
    }
}

fn scalar_value(name: &str, raw: Value) -> Result<FieldValue> {
    match raw {
        Value::Object(_) | Value::Array(_) => Err(DatalookupError::InvalidShape {
            field: name.to_string(),
            expected: "a value that is neither an object nor a list",
            found: json_type_name(&raw),
        }),
        _ => Ok(FieldValue::Scalar(raw)),
    }
}

fn array_value(name: &str, raw: Value) -> Result<FieldValue> {
    match raw {
        Value::Array(items) => {
            let fields = items
                .into_iter()
                .map(|item| {
                    Ok(Field {
                        name: name.to_string(),
                        value: classify_value(name, item)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(FieldValue::Array(fields))
        }
        _ => Err(DatalookupError::InvalidShape {
            field: name.to_string(),
            expected: "a list",
            found: json_type_name(&raw),
        }),
    }
}

fn record_value(name: &str, raw: Value) -> Result<FieldValue> {
    match raw {
        Value::Object(map) => Ok(FieldValue::Record(Box::new(Record::from_map(map)?))),
        _ => Err(DatalookupError::InvalidShape {
            field: name.to_string(),
            expected: "an object",
            found: json_type_name(&raw),
        }),
    }
}

fn records_value(name: &str, raw: Value) -> Result<FieldValue> {
    let all_objects = raw
        .as_array()
        .map(|items| items.iter().all(Value::is_object));
    match all_objects {
        Some(true) => Ok(FieldValue::Records(RecordSet::new(raw)?)),
        Some(false) => Err(DatalookupError::NotAllRecords {
            field: name.to_string(),
        }),
        None => Err(DatalookupError::InvalidShape {
            field: name.to_string(),
            expected: "a list of objects",
            found: json_type_name(&raw),
        }),
    }
}
