//! Lookup registry keyed by field variant.

use super::array::{ArrayContainedBy, ArrayContains, ArrayIn, ArrayLength, ArrayOverlap};
use super::matcher::CaseInsensitive;
use super::related::RelatedIn;
use super::scalar::{Comparison, Exact, In, IsNull, Pattern, Range, RegexMatch};
use super::{Lookup, LookupTarget};
use crate::error::{DatalookupError, Result};
use crate::path::LOOKUP_SEP;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type LookupMap = HashMap<String, Arc<dyn Lookup>>;

/// Lookups registered per [`LookupTarget`].
///
/// Each target keeps its own map. Resolution merges a target's ancestry from
/// the root down, so a name bound on a more specific target shadows the same
/// name on its ancestors. Merged maps are computed on first use and dropped
/// whenever a lookup is registered.
pub struct LookupRegistry {
    own: HashMap<LookupTarget, LookupMap>,
    merged: [OnceCell<LookupMap>; 5],
}

impl Default for LookupRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl LookupRegistry {
    /// A registry with no lookups at all.
    pub fn empty() -> Self {
        Self {
            own: HashMap::new(),
            merged: Default::default(),
        }
    }

    /// A registry holding every built-in lookup family.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        let base: Vec<Arc<dyn Lookup>> = vec![
            Arc::new(Exact),
            Arc::new(CaseInsensitive::new("iexact", Exact)),
            Arc::new(RegexMatch),
            Arc::new(CaseInsensitive::raw_pattern("iregex", RegexMatch)),
            Arc::new(Pattern::contains()),
            Arc::new(CaseInsensitive::new("icontains", Pattern::contains())),
            Arc::new(Pattern::starts_with()),
            Arc::new(CaseInsensitive::new("istartswith", Pattern::starts_with())),
            Arc::new(Pattern::ends_with()),
            Arc::new(CaseInsensitive::new("iendswith", Pattern::ends_with())),
            Arc::new(In),
            Arc::new(Range),
            Arc::new(IsNull),
            Arc::new(Comparison::gt()),
            Arc::new(Comparison::gte()),
            Arc::new(Comparison::lt()),
            Arc::new(Comparison::lte()),
        ];
        for lookup in base {
            registry.insert(LookupTarget::Any, lookup, None);
        }

        let array: Vec<Arc<dyn Lookup>> = vec![
            Arc::new(ArrayContains),
            Arc::new(ArrayContainedBy),
            Arc::new(ArrayOverlap),
            Arc::new(ArrayLength),
            Arc::new(ArrayIn),
        ];
        for lookup in array {
            registry.insert(LookupTarget::Array, lookup, None);
        }

        registry.insert(LookupTarget::Record, Arc::new(RelatedIn), None);
        registry.insert(LookupTarget::Records, Arc::new(RelatedIn), None);
        registry
    }

    /// Register a lookup on a target, under `name` or its own declared name.
    pub fn register(
        &mut self,
        target: LookupTarget,
        lookup: Arc<dyn Lookup>,
        name: Option<&str>,
    ) -> Result<()> {
        let name = name.unwrap_or_else(|| lookup.lookup_name());
        if name.is_empty() {
            return Err(DatalookupError::Registry(
                "lookup name must not be empty".to_string(),
            ));
        }
        if name.contains(LOOKUP_SEP) {
            return Err(DatalookupError::Registry(format!(
                "lookup name '{name}' must not contain '{LOOKUP_SEP}'"
            )));
        }
        let name = name.to_string();
        debug!(?target, lookup = %name, "Registering lookup");
        self.insert(target, lookup, Some(name));
        Ok(())
    }

    fn insert(&mut self, target: LookupTarget, lookup: Arc<dyn Lookup>, name: Option<String>) {
        let name = name.unwrap_or_else(|| lookup.lookup_name().to_string());
        self.own.entry(target).or_default().insert(name, lookup);
        self.merged = Default::default();
    }

    fn merged(&self, target: LookupTarget) -> &LookupMap {
        self.merged[target.index()].get_or_init(|| {
            let mut map = LookupMap::new();
            for ancestor in target.ancestry().iter().rev() {
                if let Some(own) = self.own.get(ancestor) {
                    map.extend(own.iter().map(|(name, lookup)| (name.clone(), Arc::clone(lookup))));
                }
            }
            map
        })
    }

    /// Find the lookup bound to `name` for a target, most specific binding first.
    pub fn resolve(&self, target: LookupTarget, name: &str) -> Option<Arc<dyn Lookup>> {
        self.merged(target).get(name).cloned()
    }

    /// Every lookup name available on a target, sorted.
    pub fn lookups(&self, target: LookupTarget) -> Vec<String> {
        let mut names: Vec<String> = self.merged(target).keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for LookupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for target in LookupTarget::ALL {
            let mut names: Vec<&str> = self
                .own
                .get(&target)
                .map(|own| own.keys().map(String::as_str).collect())
                .unwrap_or_default();
            names.sort_unstable();
            map.entry(&target, &names);
        }
        map.finish()
    }
}

static REGISTRY: Lazy<RwLock<LookupRegistry>> =
    Lazy::new(|| RwLock::new(LookupRegistry::with_builtins()));

/// Register a lookup in the process-wide registry.
///
/// ```
/// use datalookup::{register_lookup, FieldValue, FilterValue, Lookup, LookupTarget, RecordSet};
///
/// struct Even;
///
/// impl Lookup for Even {
///     fn lookup_name(&self) -> &str {
///         "even"
///     }
///
///     fn is_matching(&self, field: &FieldValue, _filter: &FilterValue) -> datalookup::Result<bool> {
///         Ok(field.as_scalar().and_then(|v| v.as_i64()).is_some_and(|n| n % 2 == 0))
///     }
/// }
///
/// register_lookup(LookupTarget::Scalar, Even, None)?;
/// let set = RecordSet::new(serde_json::json!([{"id": 1}, {"id": 2}]))?;
/// assert_eq!(set.filter([("id__even", true)])?.len(), 1);
/// # Ok::<(), datalookup::DatalookupError>(())
/// ```
pub fn register_lookup(
    target: LookupTarget,
    lookup: impl Lookup + 'static,
    name: Option<&str>,
) -> Result<()> {
    REGISTRY.write().register(target, Arc::new(lookup), name)
}

/// Read access to the process-wide registry.
///
/// Keep the guard short-lived: registering while it is held blocks.
pub fn registry() -> RwLockReadGuard<'static, LookupRegistry> {
    REGISTRY.read()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::filters::FilterValue;
    use serde_json::json;

    struct AlwaysTrue;

    impl Lookup for AlwaysTrue {
        fn lookup_name(&self) -> &str {
            "foo"
        }

        fn is_matching(&self, _field: &FieldValue, _filter: &FilterValue) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_builtins_are_inherited() {
        let registry = LookupRegistry::with_builtins();
        assert!(registry.resolve(LookupTarget::Scalar, "exact").is_some());
        assert!(registry.resolve(LookupTarget::Records, "exact").is_some());
        assert!(registry.resolve(LookupTarget::Array, "icontains").is_some());
        assert!(registry.resolve(LookupTarget::Scalar, "overlap").is_none());
        assert!(registry.resolve(LookupTarget::Scalar, "missing").is_none());
    }

    #[test]
    fn test_most_specific_binding_wins() {
        let registry = LookupRegistry::with_builtins();
        let field = FieldValue::Scalar(json!("xyz"));
        let scalar_contains = registry.resolve(LookupTarget::Scalar, "contains").unwrap();
        assert!(scalar_contains.resolve(&field, &FilterValue::from("y")).unwrap());

        let array = crate::Field::array("tag", json!(["x", "y"])).unwrap();
        let array_contains = registry.resolve(LookupTarget::Array, "contains").unwrap();
        // "all of" semantics rather than substring
        assert!(array_contains
            .resolve(array.get_value(), &FilterValue::from(vec!["x", "y"]))
            .unwrap());
        assert!(!array_contains
            .resolve(array.get_value(), &FilterValue::from(vec!["x", "z"]))
            .unwrap());
    }

    #[test]
    fn test_register_custom_lookup() {
        let mut registry = LookupRegistry::with_builtins();
        assert!(registry.resolve(LookupTarget::Array, "foo").is_none());

        registry
            .register(LookupTarget::Scalar, Arc::new(AlwaysTrue), None)
            .unwrap();
        // Merged maps are rebuilt after registration
        assert!(registry.resolve(LookupTarget::Scalar, "foo").is_some());
        assert!(registry.resolve(LookupTarget::Array, "foo").is_some());
        assert!(registry.resolve(LookupTarget::Record, "foo").is_none());

        registry
            .register(LookupTarget::Record, Arc::new(AlwaysTrue), Some("bar"))
            .unwrap();
        assert!(registry.lookups(LookupTarget::Record).contains(&"bar".to_string()));
    }

    #[test]
    fn test_register_rejects_bad_names() {
        let mut registry = LookupRegistry::empty();
        assert!(matches!(
            registry.register(LookupTarget::Any, Arc::new(AlwaysTrue), Some("")),
            Err(DatalookupError::Registry(_))
        ));
        assert!(matches!(
            registry.register(LookupTarget::Any, Arc::new(AlwaysTrue), Some("a__b")),
            Err(DatalookupError::Registry(_))
        ));
        assert!(registry.lookups(LookupTarget::Any).is_empty());
    }

    #[test]
    fn test_lookups_are_sorted() {
        let registry = LookupRegistry::with_builtins();
        let names = registry.lookups(LookupTarget::Record);
        assert!(names.contains(&"in".to_string()));
        assert!(names.contains(&"isnull".to_string()));
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
