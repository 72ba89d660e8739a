//! Lookup system: named comparison rules bound to field variants.
//!
//! A lookup receives the stored field value and the filter value and decides
//! whether the field matches. Lookups are registered per [`LookupTarget`];
//! resolving a name walks the target's ancestry so that, for example, array
//! fields inherit every base lookup they do not override.
//!
//! # Module Structure
//!
//! - `matcher` - Shared comparison helpers and the case-insensitive wrapper
//! - `scalar` - Base lookups (exact, patterns, membership, range, comparison, isnull)
//! - `array` - Array lookups (contains, contained_by, overlap, len, in)
//! - `related` - Related-record membership (`in` on nested records and collections)
//! - `registry` - Per-target registry with specificity-ordered merging

mod array;
pub(crate) mod matcher;
mod registry;
mod related;
mod scalar;

use crate::error::{DatalookupError, Result};
use crate::field::FieldValue;
use crate::filters::{FilterType, FilterValue};
use std::borrow::Cow;

pub use array::{ArrayContainedBy, ArrayContains, ArrayIn, ArrayLength, ArrayOverlap};
pub use matcher::CaseInsensitive;
pub use registry::{register_lookup, registry, LookupRegistry};
pub use related::RelatedIn;
pub use scalar::{Comparison, Exact, In, IsNull, Pattern, Range, RegexMatch};

/// Field variants lookups can be registered against.
///
/// `Any` is the common ancestor of every variant; `Array` additionally
/// inherits from `Scalar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupTarget {
    Any,
    Scalar,
    Array,
    Record,
    Records,
}

impl LookupTarget {
    pub const ALL: [LookupTarget; 5] = [
        LookupTarget::Any,
        LookupTarget::Scalar,
        LookupTarget::Array,
        LookupTarget::Record,
        LookupTarget::Records,
    ];

    /// This target followed by its ancestors, most specific first.
    pub fn ancestry(self) -> &'static [LookupTarget] {
        match self {
            LookupTarget::Any => &[LookupTarget::Any],
            LookupTarget::Scalar => &[LookupTarget::Scalar, LookupTarget::Any],
            LookupTarget::Array => &[LookupTarget::Array, LookupTarget::Scalar, LookupTarget::Any],
            LookupTarget::Record => &[LookupTarget::Record, LookupTarget::Any],
            LookupTarget::Records => &[LookupTarget::Records, LookupTarget::Any],
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A named predicate applied to one field value.
///
/// Implementors provide [`Lookup::lookup_name`] and [`Lookup::is_matching`];
/// the remaining hooks have identity defaults. [`Lookup::resolve`] runs them
/// in order: prepare both values, check the filter value type, then match.
pub trait Lookup: Send + Sync {
    /// Name used when the lookup is registered without an explicit name.
    fn lookup_name(&self) -> &str;

    /// Accepted filter value types. Empty accepts anything.
    fn filter_types(&self) -> &[FilterType] {
        &[]
    }

    fn prepare_filter_value<'a>(&self, value: &'a FilterValue) -> Cow<'a, FilterValue> {
        Cow::Borrowed(value)
    }

    fn prepare_field_value<'a>(&self, value: &'a FieldValue) -> Cow<'a, FieldValue> {
        Cow::Borrowed(value)
    }

    fn check_filter_value_type(&self, value: &FilterValue) -> Result<()> {
        let accepted = self.filter_types();
        if accepted.is_empty() || accepted.iter().any(|t| t.accepts(value)) {
            return Ok(());
        }
        let expected = accepted
            .iter()
            .map(FilterType::label)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(DatalookupError::lookup_type(
            self.lookup_name(),
            expected,
            value.type_name(),
        ))
    }

    fn is_matching(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool>;

    fn resolve(&self, field: &FieldValue, filter: &FilterValue) -> Result<bool> {
        let filter = self.prepare_filter_value(filter);
        let field = self.prepare_field_value(field);
        self.check_filter_value_type(&filter)?;
        self.is_matching(&field, &filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestry_is_most_specific_first() {
        assert_eq!(
            LookupTarget::Array.ancestry(),
            &[LookupTarget::Array, LookupTarget::Scalar, LookupTarget::Any]
        );
        assert_eq!(
            LookupTarget::Records.ancestry(),
            &[LookupTarget::Records, LookupTarget::Any]
        );
        for target in LookupTarget::ALL {
            assert_eq!(target.ancestry()[0], target);
            assert_eq!(LookupTarget::ALL[target.index()], target);
        }
    }

    struct OnlyStrings;

    impl Lookup for OnlyStrings {
        fn lookup_name(&self) -> &str {
            "only_strings"
        }

        fn filter_types(&self) -> &[FilterType] {
            &[FilterType::String]
        }

        fn is_matching(&self, _field: &FieldValue, _filter: &FilterValue) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_resolve_checks_filter_type() {
        let field = FieldValue::Scalar(serde_json::json!("x"));
        assert!(OnlyStrings.resolve(&field, &FilterValue::from("y")).unwrap());
        let err = OnlyStrings.resolve(&field, &FilterValue::from(1)).unwrap_err();
        assert!(matches!(err, DatalookupError::LookupType { .. }));
    }
}
