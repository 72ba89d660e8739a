//! Base lookups, registered against every field variant.

use super::matcher::{compare_scalars, field_equals, field_equals_json};
use super::Lookup;
use crate::error::{json_type_name, DatalookupError, Result};
use crate::field::FieldValue;
use crate::filters::{FilterType, FilterValue};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Equality. Numbers compare by value, so `1` equals `1.0`.
pub struct Exact;

impl Lookup for Exact {
    fn lookup_name(&self) -> &str {
        "exact"
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        Ok(field_equals(field, filter))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// Substring, prefix and suffix tests on string fields.
///
/// Fields that do not hold a string never match.
pub struct Pattern {
    name: &'static str,
    kind: PatternKind,
}

impl Pattern {
    pub fn contains() -> Self {
        Self {
            name: "contains",
            kind: PatternKind::Contains,
        }
    }

    pub fn starts_with() -> Self {
        Self {
            name: "startswith",
            kind: PatternKind::StartsWith,
        }
    }

    pub fn ends_with() -> Self {
        Self {
            name: "endswith",
            kind: PatternKind::EndsWith,
        }
    }
}

impl Lookup for Pattern {
    fn lookup_name(&self) -> &str {
        self.name
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::String]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let (Some(Value::String(value)), Some(Value::String(needle))) =
            (field.as_scalar(), filter.as_json())
        else {
            return Ok(false);
        };
        Ok(match self.kind {
            PatternKind::Contains => value.contains(needle.as_str()),
            PatternKind::StartsWith => value.starts_with(needle.as_str()),
            PatternKind::EndsWith => value.ends_with(needle.as_str()),
        })
    }
}

/// Distinct patterns kept compiled at once.
const PATTERN_CACHE_SIZE: usize = 256;

struct CachedPattern {
    regex: Arc<regex::Regex>,
    last_accessed: u64,
}

/// Compiled patterns keyed by source, evicting the least recently used.
struct PatternCache {
    entries: HashMap<String, CachedPattern>,
    clock: u64,
    max_size: usize,
}

impl PatternCache {
    fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            clock: 0,
            max_size,
        }
    }

    fn get(&mut self, pattern: &str) -> Option<Arc<regex::Regex>> {
        self.clock += 1;
        let entry = self.entries.get_mut(pattern)?;
        entry.last_accessed = self.clock;
        Some(Arc::clone(&entry.regex))
    }

    fn insert(&mut self, pattern: &str, regex: Arc<regex::Regex>) {
        if self.entries.len() >= self.max_size && !self.entries.contains_key(pattern) {
            self.evict_lru();
        }
        self.clock += 1;
        self.entries.insert(
            pattern.to_string(),
            CachedPattern {
                regex,
                last_accessed: self.clock,
            },
        );
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(pattern, _)| pattern.clone());
        if let Some(pattern) = oldest {
            self.entries.remove(&pattern);
            trace!(%pattern, "Evicted compiled pattern");
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

static COMPILED_PATTERNS: Lazy<Mutex<PatternCache>> =
    Lazy::new(|| Mutex::new(PatternCache::new(PATTERN_CACHE_SIZE)));

/// Compile a pattern anchored at the start of the value, reusing recent compilations.
fn compiled_pattern(pattern: &str) -> Result<Arc<regex::Regex>> {
    if let Some(regex) = COMPILED_PATTERNS.lock().get(pattern) {
        return Ok(regex);
    }
    let regex = regex::Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
        DatalookupError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;
    let regex = Arc::new(regex);
    COMPILED_PATTERNS.lock().insert(pattern, Arc::clone(&regex));
    Ok(regex)
}

/// Regular expression match anchored at the start of the value.
///
/// `^a` and `a` behave the same; the pattern does not have to consume the
/// whole value.
pub struct RegexMatch;

impl Lookup for RegexMatch {
    fn lookup_name(&self) -> &str {
        "regex"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::String]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let Some(Value::String(pattern)) = filter.as_json() else {
            return Ok(false);
        };
        let regex = compiled_pattern(pattern)?;
        match field.as_scalar() {
            Some(Value::String(value)) => Ok(regex.is_match(value)),
            _ => Ok(false),
        }
    }
}

/// Membership of the field value in a list, a string or a record set.
///
/// A string filter tests for a substring and requires a string field.
pub struct In;

impl Lookup for In {
    fn lookup_name(&self) -> &str {
        "in"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List, FilterType::String, FilterType::Records]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        scalar_in(field, filter)
    }
}

pub(crate) fn scalar_in(field: &FieldValue, filter: &FilterValue) -> Result<bool> {
    match filter {
        FilterValue::Json(Value::Array(items)) => {
            Ok(items.iter().any(|item| field_equals_json(field, item)))
        }
        FilterValue::Json(Value::String(haystack)) => match field.as_scalar() {
            Some(Value::String(value)) => Ok(haystack.contains(value.as_str())),
            _ => Err(DatalookupError::lookup_type(
                "in",
                "a string field for a string filter",
                field_type_name(field),
            )),
        },
        FilterValue::Records(records) => Ok(match field {
            FieldValue::Record(record) => records.contains(record),
            _ => false,
        }),
        FilterValue::Json(other) => Err(DatalookupError::lookup_type(
            "in",
            "list or string or record set",
            json_type_name(other),
        )),
    }
}

fn field_type_name(field: &FieldValue) -> &'static str {
    match field {
        FieldValue::Scalar(value) => json_type_name(value),
        FieldValue::Array(_) => "array",
        FieldValue::Record(_) => "record",
        FieldValue::Records(_) => "record set",
    }
}

/// Half-open integer range `[lo, hi)` given as a two-element list.
pub struct Range;

impl Lookup for Range {
    fn lookup_name(&self) -> &str {
        "range"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let bounds = match filter.as_json() {
            Some(Value::Array(items)) if items.len() == 2 => {
                items[0].as_i64().zip(items[1].as_i64())
            }
            _ => None,
        };
        let Some((lo, hi)) = bounds else {
            return Err(DatalookupError::lookup_type(
                "range",
                "a list of two integers",
                filter.to_string(),
            ));
        };
        let value = match field.as_scalar() {
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            _ => None,
        };
        Ok(value.is_some_and(|v| lo <= v && v < hi))
    }
}

/// Null test. `true` selects null fields, `false` selects everything else.
pub struct IsNull;

impl Lookup for IsNull {
    fn lookup_name(&self) -> &str {
        "isnull"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::Bool]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let expected = matches!(filter.as_json(), Some(Value::Bool(true)));
        let is_null = matches!(field, FieldValue::Scalar(Value::Null));
        Ok(is_null == expected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Ordering comparisons between a scalar field and a scalar filter value.
///
/// Numbers compare with numbers, strings with strings and bools with bools.
/// Any other pairing is a type error rather than a mismatch.
pub struct Comparison {
    name: &'static str,
    op: ComparisonOp,
}

impl Comparison {
    pub fn gt() -> Self {
        Self {
            name: "gt",
            op: ComparisonOp::Gt,
        }
    }

    pub fn gte() -> Self {
        Self {
            name: "gte",
            op: ComparisonOp::Gte,
        }
    }

    pub fn lt() -> Self {
        Self {
            name: "lt",
            op: ComparisonOp::Lt,
        }
    }

    pub fn lte() -> Self {
        Self {
            name: "lte",
            op: ComparisonOp::Lte,
        }
    }
}

impl Lookup for Comparison {
    fn lookup_name(&self) -> &str {
        self.name
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let (Some(value), Some(bound)) = (field.as_scalar(), filter.as_json()) else {
            return Err(DatalookupError::lookup_type(
                self.name,
                "a scalar field and a scalar value",
                filter.type_name(),
            ));
        };
        let ordering = compare_scalars(self.name, value, bound)?;
        Ok(match self.op {
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::Gte => ordering != Ordering::Less,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::Lte => ordering != Ordering::Greater,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::CaseInsensitive;
    use serde_json::json;

    fn scalar(value: Value) -> FieldValue {
        FieldValue::Scalar(value)
    }

    #[test]
    fn test_exact() {
        assert!(Exact.resolve(&scalar(json!(1)), &FilterValue::from(1.0)).unwrap());
        assert!(!Exact.resolve(&scalar(json!("a")), &FilterValue::from("A")).unwrap());
        let iexact = CaseInsensitive::new("iexact", Exact);
        assert!(iexact.resolve(&scalar(json!("Fantasy")), &FilterValue::from("fantasy")).unwrap());
    }

    #[test]
    fn test_patterns() {
        let title = scalar(json!("And Then There Were None"));
        assert!(Pattern::contains().resolve(&title, &FilterValue::from("Then")).unwrap());
        assert!(!Pattern::contains().resolve(&title, &FilterValue::from("then")).unwrap());
        assert!(Pattern::starts_with().resolve(&title, &FilterValue::from("And")).unwrap());
        assert!(Pattern::ends_with().resolve(&title, &FilterValue::from("None")).unwrap());

        let icontains = CaseInsensitive::new("icontains", Pattern::contains());
        assert!(icontains.resolve(&title, &FilterValue::from("THEN")).unwrap());

        // Non-string fields never match
        assert!(!Pattern::contains().resolve(&scalar(json!(12)), &FilterValue::from("1")).unwrap());
        assert!(matches!(
            Pattern::contains().resolve(&title, &FilterValue::from(1)),
            Err(DatalookupError::LookupType { .. })
        ));
    }

    #[test]
    fn test_regex_is_anchored_at_start() {
        let value = scalar(json!("Richard Adams"));
        assert!(RegexMatch.resolve(&value, &FilterValue::from("Rich")).unwrap());
        assert!(!RegexMatch.resolve(&value, &FilterValue::from("Adams")).unwrap());
        assert!(RegexMatch.resolve(&value, &FilterValue::from(".*Adams")).unwrap());

        let iregex = CaseInsensitive::raw_pattern("iregex", RegexMatch);
        assert!(iregex.resolve(&value, &FilterValue::from("rich")).unwrap());

        assert!(matches!(
            RegexMatch.resolve(&value, &FilterValue::from("(")),
            Err(DatalookupError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_pattern_cache_evicts_least_recently_used() {
        let mut cache = PatternCache::new(2);
        for pattern in ["a", "b"] {
            cache.insert(pattern, Arc::new(regex::Regex::new(pattern).unwrap()));
        }
        assert!(cache.get("a").is_some());
        cache.insert("c", Arc::new(regex::Regex::new("c").unwrap()));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_compiled_patterns_stay_bounded() {
        for i in 0..PATTERN_CACHE_SIZE + 100 {
            let regex = compiled_pattern(&format!("bounded-{i}")).unwrap();
            assert!(regex.is_match(&format!("bounded-{i}-tail")));
        }
        assert!(COMPILED_PATTERNS.lock().len() <= PATTERN_CACHE_SIZE);
    }

    #[test]
    fn test_in() {
        let value = scalar(json!("Fantasy"));
        assert!(In.resolve(&value, &FilterValue::from(vec!["Mystery", "Fantasy"])).unwrap());
        assert!(!In.resolve(&value, &FilterValue::from(vec!["Mystery"])).unwrap());
        assert!(In.resolve(&value, &FilterValue::from("Fantasy, Mystery")).unwrap());
        assert!(matches!(
            In.resolve(&scalar(json!(1)), &FilterValue::from("123")),
            Err(DatalookupError::LookupType { .. })
        ));
        assert!(matches!(
            In.resolve(&value, &FilterValue::from(1)),
            Err(DatalookupError::LookupType { .. })
        ));
    }

    #[test]
    fn test_range_is_half_open() {
        let range = FilterValue::from((1i64, 3i64));
        assert!(Range.resolve(&scalar(json!(1)), &range).unwrap());
        assert!(Range.resolve(&scalar(json!(2.0)), &range).unwrap());
        assert!(!Range.resolve(&scalar(json!(3)), &range).unwrap());
        assert!(!Range.resolve(&scalar(json!("2")), &range).unwrap());
        assert!(Range
            .resolve(&scalar(json!(1)), &FilterValue::from(vec![1]))
            .is_err());
    }

    #[test]
    fn test_isnull() {
        assert!(IsNull.resolve(&scalar(json!(null)), &FilterValue::from(true)).unwrap());
        assert!(!IsNull.resolve(&scalar(json!(15)), &FilterValue::from(true)).unwrap());
        assert!(IsNull.resolve(&scalar(json!(15)), &FilterValue::from(false)).unwrap());
        assert!(matches!(
            IsNull.resolve(&scalar(json!(null)), &FilterValue::from("yes")),
            Err(DatalookupError::LookupType { .. })
        ));
    }

    #[test]
    fn test_comparisons() {
        let value = scalar(json!(2));
        assert!(Comparison::gt().resolve(&value, &FilterValue::from(1)).unwrap());
        assert!(!Comparison::gt().resolve(&value, &FilterValue::from(2)).unwrap());
        assert!(Comparison::gte().resolve(&value, &FilterValue::from(2)).unwrap());
        assert!(Comparison::lt().resolve(&value, &FilterValue::from(2.5)).unwrap());
        assert!(Comparison::lte().resolve(&value, &FilterValue::from(2)).unwrap());
        assert!(matches!(
            Comparison::gt().resolve(&value, &FilterValue::from("1")),
            Err(DatalookupError::LookupType { .. })
        ));
    }
}
