//! Membership lookup for nested records and record collections.

use super::matcher::filter_records;
use super::Lookup;
use crate::error::Result;
use crate::field::FieldValue;
use crate::filters::{FilterType, FilterValue};

/// True when any record reachable through the field is structurally equal
/// to a record of the supplied collection.
///
/// The filter value is a record set or a JSON list; list elements that are
/// not objects are ignored.
pub struct RelatedIn;

impl Lookup for RelatedIn {
    fn lookup_name(&self) -> &str {
        "in"
    }

    fn filter_types(&self) -> &[FilterType] {
        &[FilterType::List, FilterType::Records]
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let candidates = filter_records(filter);
        Ok(field
            .related_records()
            .into_iter()
            .any(|record| candidates.iter().any(|candidate| **candidate == *record)))
    }
}
