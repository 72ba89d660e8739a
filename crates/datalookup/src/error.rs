//! Error taxonomy shared by every datalookup operation.

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DatalookupError>;

/// Errors raised while building records or evaluating lookups.
///
/// A record that simply does not satisfy a filter is never reported through
/// this type; it is dropped from the result set instead.
#[derive(Debug, thiserror::Error)]
pub enum DatalookupError {
    /// A field was given a value of the wrong container type.
    #[error("Field '{field}' expected {expected}, got {found}")]
    InvalidShape {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A record collection was given a list holding something other than objects.
    #[error("Field '{field}' must be a list where every element is an object")]
    NotAllRecords { field: String },

    /// A record can only be built from an object.
    #[error("A record must be built from an object, got {found}")]
    InvalidRecord { found: &'static str },

    /// A record set can only be built from an object or a list of objects.
    #[error("A record set must be built from an object or a list of objects, got {found}")]
    InvalidRecordSet { found: &'static str },

    #[error("Invalid field name '{name}': {reason}")]
    InvalidFieldName { name: String, reason: &'static str },

    /// A filter key does not match any path reachable from the record.
    #[error("{filter} filter does not exist")]
    FilterDoesNotExist { filter: String },

    #[error("'{lookup}' lookup not found for field '{field}', available: {available}")]
    LookupNotFound {
        lookup: String,
        field: String,
        available: String,
    },

    /// The filter value type is not accepted by the lookup.
    #[error("Cannot apply lookup \"{lookup}\": expected {expected}, got {found}")]
    LookupType {
        lookup: String,
        expected: String,
        found: String,
    },

    #[error("{name} field not found")]
    FieldNotFound { name: String },

    #[error("{name} attribute does not exist")]
    AttributeNotFound { name: String },

    #[error("Lookup registry error: {0}")]
    Registry(String),

    #[error("Negative indexing is not supported")]
    NegativeIndex,

    #[error("Index {index} out of range for a record set of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl DatalookupError {
    /// Build a [`DatalookupError::LookupType`] for a lookup that received an unexpected value.
    pub(crate) fn lookup_type(
        lookup: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        DatalookupError::LookupType {
            lookup: lookup.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Short type label for a raw JSON value, used in error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
