//! Ordered collections of records and the query operations over them.

use crate::error::{json_type_name, DatalookupError, Result};
use crate::filters::{FilterValue, Filters};
use crate::path::RELATED_SEP;
use crate::record::{Criteria, Record};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitOr, Index};
use std::path::Path;
use tracing::debug;

/// Number of records shown by `Display` before truncating.
pub const REPR_OUTPUT_SIZE: usize = 20;

/// Records in insertion order.
///
/// Duplicates are kept until [`RecordSet::distinct`] removes them. Two sets
/// are equal when they hold the same records, regardless of order or
/// repetition.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Build a set from an object (one record) or a list of objects.
    pub fn new(raw: Value) -> Result<Self> {
        let records = match raw {
            Value::Object(map) => vec![Record::from_map(map)?],
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Record::from_map(map),
                    other => Err(DatalookupError::InvalidRecordSet {
                        found: json_type_name(&other),
                    }),
                })
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(DatalookupError::InvalidRecordSet {
                    found: json_type_name(&other),
                })
            }
        };
        Ok(Self { records })
    }

    /// Wrap existing records without copying them.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Self::new(serde_json::from_str(input)?)
    }

    /// Load a JSON document from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Record at `index`. Negative indices are rejected rather than wrapped.
    pub fn at(&self, index: isize) -> Result<&Record> {
        let index = usize::try_from(index).map_err(|_| DatalookupError::NegativeIndex)?;
        self.records
            .get(index)
            .ok_or(DatalookupError::IndexOutOfRange {
                index,
                len: self.records.len(),
            })
    }

    /// Records in `[start, end)`, clamped to the set's length.
    pub fn slice(&self, start: Option<isize>, end: Option<isize>) -> Result<RecordSet> {
        let bound = |value: Option<isize>, default: usize| -> Result<usize> {
            match value {
                None => Ok(default),
                Some(v) => usize::try_from(v)
                    .map(|v| v.min(self.records.len()))
                    .map_err(|_| DatalookupError::NegativeIndex),
            }
        };
        let start = bound(start, 0)?;
        let end = bound(end, self.records.len())?;
        let records = if start < end {
            self.records[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(Self { records })
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.records.contains(record)
    }

    /// Plain JSON list of every record.
    pub fn values(&self) -> Value {
        Value::Array(self.records.iter().map(Record::values).collect())
    }

    /// Records matching every filter.
    ///
    /// ```
    /// # use datalookup::RecordSet;
    /// let set = RecordSet::new(serde_json::json!([{"id": 1}, {"id": 2}]))?;
    /// assert_eq!(set.filter([("id__gte", 2)])?.len(), 1);
    /// # Ok::<(), datalookup::DatalookupError>(())
    /// ```
    pub fn filter<I, K, V>(&self, filters: I) -> Result<RecordSet>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.filter_by(&filters.into_iter().collect())
    }

    pub fn filter_by(&self, filters: &Filters) -> Result<RecordSet> {
        let criteria: Vec<_> = filters.iter().collect();
        let matched = self.filter_criteria(&criteria)?;
        debug!(
            "Filtered {} of {} records with {:?}",
            matched.len(),
            self.len(),
            filters.keys().collect::<Vec<_>>()
        );
        Ok(matched)
    }

    /// Records that [`RecordSet::filter`] would drop. No filters returns the
    /// set unchanged.
    pub fn exclude<I, K, V>(&self, filters: I) -> Result<RecordSet>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.exclude_by(&filters.into_iter().collect())
    }

    pub fn exclude_by(&self, filters: &Filters) -> Result<RecordSet> {
        if filters.is_empty() {
            return Ok(self.clone());
        }
        let criteria: Vec<_> = filters.iter().collect();
        let mut records = Vec::new();
        for record in &self.records {
            if record.evaluate(&criteria)?.is_none() {
                records.push(record.clone());
            }
        }
        debug!("Excluded {} of {} records", self.len() - records.len(), self.len());
        Ok(Self { records })
    }

    /// Evaluate every record first, then build the result, so an error
    /// leaves nothing half-filtered.
    pub(crate) fn filter_criteria(&self, criteria: &Criteria<'_>) -> Result<RecordSet> {
        let mut matched = Vec::new();
        for record in &self.records {
            if let Some(replacements) = record.evaluate(criteria)? {
                matched.push((record, replacements));
            }
        }
        let records = matched
            .into_iter()
            .map(|(record, replacements)| {
                let mut record = record.clone();
                record.apply(replacements);
                record
            })
            .collect();
        Ok(Self { records })
    }

    /// Every record reachable through a dotted path such as `batters.batter`,
    /// depth first.
    pub fn related_records(&self, path: &str) -> Result<RecordSet> {
        let mut current: Vec<&Record> = self.records.iter().collect();
        for name in path.split(RELATED_SEP) {
            let mut next = Vec::new();
            for record in current {
                next.extend(record.get_field(name)?.related_records());
            }
            current = next;
        }
        Ok(Self {
            records: current.into_iter().cloned().collect(),
        })
    }

    /// Filter the records reachable through a dotted path.
    pub fn filter_related<I, K, V>(&self, path: &str, filters: I) -> Result<RecordSet>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.related_records(path)?.filter(filters)
    }

    /// Drop structural duplicates, keeping first occurrences.
    pub fn distinct(&self) -> RecordSet {
        let mut records: Vec<Record> = Vec::with_capacity(self.records.len());
        for record in &self.records {
            if !records.contains(record) {
                records.push(record.clone());
            }
        }
        Self { records }
    }

    /// This set's distinct records followed by the other set's records not
    /// already present.
    pub fn union(&self, other: &RecordSet) -> RecordSet {
        let mut result = self.distinct();
        for record in &other.records {
            if !result.records.contains(record) {
                result.records.push(record.clone());
            }
        }
        result
    }

    /// Turn on cascading for every record, for chaining into a filter.
    pub fn on_cascade(&mut self) -> &mut Self {
        for record in &mut self.records {
            record.activate_on_cascade();
        }
        self
    }

    /// Sorted, deduplicated record fingerprints.
    pub(crate) fn fingerprints(&self) -> Vec<u64> {
        let mut hashes: Vec<u64> = self.records.iter().map(Record::fingerprint).collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes
    }
}

impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        let ours: HashSet<&Record> = self.records.iter().collect();
        let theirs: HashSet<&Record> = other.records.iter().collect();
        ours == theirs
    }
}

impl Eq for RecordSet {}

impl Hash for RecordSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprints().hash(state);
    }
}

impl Index<usize> for RecordSet {
    type Output = Record;

    fn index(&self, index: usize) -> &Record {
        &self.records[index]
    }
}

impl BitOr for &RecordSet {
    type Output = RecordSet;

    fn bitor(self, other: &RecordSet) -> RecordSet {
        self.union(other)
    }
}

impl BitOr for RecordSet {
    type Output = RecordSet;

    fn bitor(self, other: RecordSet) -> RecordSet {
        self.union(&other)
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<String> = self
            .records
            .iter()
            .take(REPR_OUTPUT_SIZE)
            .map(|record| format!("<Record: {record}>"))
            .collect();
        if self.records.len() > REPR_OUTPUT_SIZE {
            items.push("...(remaining elements truncated)...".to_string());
        }
        write!(f, "<RecordSet [{}]>", items.join(", "))
    }
}

impl Serialize for RecordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RecordSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        RecordSet::new(raw).map_err(D::Error::custom)
    }
}
