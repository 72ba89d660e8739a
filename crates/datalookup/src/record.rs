//! A single decoded object and per-record filter evaluation.

use crate::error::{json_type_name, DatalookupError, Result};
use crate::field::{unordered_hash, Field, FieldValue};
use crate::filters::{FilterValue, Filters};
use crate::lookup::{registry, Lookup};
use crate::path::{collect_paths, resolve_key, validate_keys, ResolvedKey};
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

/// Filter keys paired with their values, borrowed from the caller.
pub(crate) type Criteria<'a> = [(&'a str, &'a FilterValue)];

/// Field replacements computed by a successful cascading evaluation.
pub(crate) type Replacements = Vec<(usize, FieldValue)>;

/// One decoded object: named fields in insertion order plus a cascade flag.
///
/// Equality and hashing ignore field order and the cascade flag.
#[derive(Clone)]
pub struct Record {
    fields: Vec<Field>,
    cascade: bool,
    paths: OnceCell<BTreeSet<String>>,
}

impl Record {
    /// Build a record from a JSON object.
    pub fn new(raw: Value) -> Result<Self> {
        match raw {
            Value::Object(map) => Self::from_map(map),
            other => Err(DatalookupError::InvalidRecord {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        let fields = map
            .into_iter()
            .map(|(name, raw)| Field::classify(name, raw))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            fields,
            cascade: false,
            paths: OnceCell::new(),
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get_field(&self, name: &str) -> Result<&Field> {
        self.position(name)
            .map(|index| &self.fields[index])
            .ok_or_else(|| DatalookupError::FieldNotFound {
                name: name.to_string(),
            })
    }

    /// Mutable access to a field, for [`Field::set_value`].
    pub fn get_field_mut(&mut self, name: &str) -> Result<&mut Field> {
        let index = self
            .position(name)
            .ok_or_else(|| DatalookupError::FieldNotFound {
                name: name.to_string(),
            })?;
        // The new value may reach different paths
        self.paths = OnceCell::new();
        Ok(&mut self.fields[index])
    }

    /// Attribute-style access to a field's value.
    pub fn get(&self, name: &str) -> Result<&FieldValue> {
        self.position(name)
            .map(|index| self.fields[index].get_value())
            .ok_or_else(|| DatalookupError::AttributeNotFound {
                name: name.to_string(),
            })
    }

    /// A field's value converted back to plain JSON.
    pub fn value_of(&self, name: &str) -> Result<Value> {
        self.get(name).map(FieldValue::deserialize)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.get_name() == name)
    }

    /// Every path reachable from this record, computed once.
    pub fn paths(&self) -> &BTreeSet<String> {
        self.paths.get_or_init(|| collect_paths(&self.fields))
    }

    /// Records reachable directly through any field.
    pub fn related_records(&self) -> Vec<&Record> {
        self.fields
            .iter()
            .flat_map(|field| field.related_records())
            .collect()
    }

    /// Turn on cascading for this record and every record reachable from it.
    pub fn activate_on_cascade(&mut self) {
        self.cascade = true;
        for field in &mut self.fields {
            for record in field.value_mut().related_records_mut() {
                record.activate_on_cascade();
            }
        }
    }

    pub fn is_cascading(&self) -> bool {
        self.cascade
    }

    /// Check this record against a set of filters.
    ///
    /// Returns `Ok(false)` when the record does not match. When cascading is
    /// on, related fields are narrowed to their matching records, and only
    /// once every filter has passed.
    pub fn filter(&mut self, filters: &Filters) -> Result<bool> {
        let criteria: Vec<_> = filters.iter().collect();
        match self.evaluate(&criteria)? {
            Some(replacements) => {
                self.apply(replacements);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Evaluate criteria without touching the record.
    ///
    /// `Ok(None)` is a mismatch. `Ok(Some(_))` carries the field values a
    /// cascading record should swap in.
    pub(crate) fn evaluate(&self, criteria: &Criteria<'_>) -> Result<Option<Replacements>> {
        if criteria.is_empty() {
            return Ok(Some(Vec::new()));
        }
        let paths = self.paths();
        validate_keys(paths, criteria.iter().map(|(key, _)| *key))?;

        let mut direct: Vec<(usize, &str, &FilterValue)> = Vec::new();
        let mut forwarded: Vec<(usize, Vec<(&str, &FilterValue)>)> = Vec::new();
        for (key, value) in criteria {
            match resolve_key(paths, key) {
                Some(ResolvedKey::Direct { field, lookup }) => {
                    direct.push((self.index_of(field, key)?, lookup, *value));
                }
                Some(ResolvedKey::Forward { field, rest }) => {
                    let index = self.index_of(field, key)?;
                    match forwarded.iter_mut().find(|(i, _)| *i == index) {
                        Some((_, group)) => group.push((rest, *value)),
                        None => forwarded.push((index, vec![(rest, *value)])),
                    }
                }
                None => {
                    return Err(DatalookupError::FilterDoesNotExist {
                        filter: key.to_string(),
                    })
                }
            }
        }

        // Resolve every lookup first so an unknown name is reported even
        // when an earlier predicate would not match.
        let lookups = direct
            .iter()
            .map(|(index, name, _)| self.lookup_for(&self.fields[*index], name))
            .collect::<Result<Vec<_>>>()?;
        for (lookup, (index, _, value)) in lookups.iter().zip(&direct) {
            let field = &self.fields[*index];
            if !lookup.resolve(field.get_value(), value)? {
                trace!(field = field.get_name(), lookup = lookup.lookup_name(), "Record did not match");
                return Ok(None);
            }
        }

        let mut replacements = Vec::new();
        for (index, group) in &forwarded {
            let field = &self.fields[*index];
            match field.get_value() {
                FieldValue::Record(record) => match record.evaluate(group)? {
                    None => return Ok(None),
                    Some(nested) if !nested.is_empty() => {
                        let mut narrowed = record.as_ref().clone();
                        narrowed.apply(nested);
                        replacements.push((*index, FieldValue::Record(Box::new(narrowed))));
                    }
                    Some(_) => {}
                },
                FieldValue::Records(records) => {
                    let matched = records.filter_criteria(group)?;
                    if matched.is_empty() {
                        return Ok(None);
                    }
                    if self.cascade {
                        replacements.push((*index, FieldValue::Records(matched)));
                    }
                }
                FieldValue::Scalar(_) | FieldValue::Array(_) => {
                    return Err(DatalookupError::FilterDoesNotExist {
                        filter: field.get_name().to_string(),
                    })
                }
            }
        }
        Ok(Some(replacements))
    }

    pub(crate) fn apply(&mut self, replacements: Replacements) {
        if replacements.is_empty() {
            return;
        }
        for (index, value) in replacements {
            trace!("Cascading filtered records into '{}'", self.fields[index].get_name());
            self.fields[index].replace_value(value);
        }
        self.paths = OnceCell::new();
    }

    fn index_of(&self, field: &str, key: &str) -> Result<usize> {
        self.position(field)
            .ok_or_else(|| DatalookupError::FilterDoesNotExist {
                filter: key.to_string(),
            })
    }

    fn lookup_for(&self, field: &Field, name: &str) -> Result<Arc<dyn Lookup>> {
        let target = field.get_value().target();
        let registry = registry();
        registry
            .resolve(target, name)
            .ok_or_else(|| DatalookupError::LookupNotFound {
                lookup: name.to_string(),
                field: field.get_name().to_string(),
                available: registry.lookups(target).join(", "),
            })
    }

    /// Plain JSON object holding every field.
    pub fn values(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|field| (field.get_name().to_string(), field.deserialize()))
                .collect(),
        )
    }

    pub(crate) fn fingerprint(&self) -> u64 {
        unordered_hash(4, self.fields.iter().map(Field::fingerprint).collect())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().all(|field| other.fields.contains(field))
            && other.fields.iter().all(|field| self.fields.contains(field))
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint());
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("fields", &self.fields)
            .field("cascade", &self.cascade)
            .finish()
    }
}

/// `Record object (V)` where V is the first field's value. Null prints as
/// `None` and booleans as `True`/`False`.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fields.first().map(Field::deserialize) {
            Some(Value::String(s)) => write!(f, "Record object ({s})"),
            Some(Value::Bool(true)) => write!(f, "Record object (True)"),
            Some(Value::Bool(false)) => write!(f, "Record object (False)"),
            Some(Value::Null) | None => write!(f, "Record object (None)"),
            Some(value) => write!(f, "Record object ({value})"),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.values().serialize(serializer)
    }
}
