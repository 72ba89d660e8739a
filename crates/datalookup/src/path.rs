//! Filter key resolution.
//!
//! A filter key such as `books__genre__icontains` is split against the set of
//! paths reachable from a record. The longest path that is a prefix of the key
//! on a separator boundary wins; the rest of the key is either a lookup name
//! or, when the path goes through a related field, forwarded to that field's
//! records.

use crate::error::{DatalookupError, Result};
use crate::field::Field;
use std::collections::BTreeSet;

/// Separator between field names and lookup names in filter keys.
pub const LOOKUP_SEP: &str = "__";

/// Separator between field names in related-record paths (`batters.batter`).
pub const RELATED_SEP: &str = ".";

/// Lookup applied when a key names a field and nothing else.
pub const DEFAULT_LOOKUP: &str = "exact";

/// How a filter key applies to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKey<'a> {
    /// Apply `lookup` to the field named `field` on this record.
    Direct { field: &'a str, lookup: &'a str },
    /// Hand `rest` to the records reachable through `field`.
    Forward { field: &'a str, rest: &'a str },
}

/// Every path reachable from a list of fields.
///
/// A field `books` whose records hold `genre` contributes both `books` and
/// `books__genre`.
pub fn collect_paths(fields: &[Field]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for field in fields {
        let name = field.get_name();
        paths.insert(name.to_string());
        for record in field.related_records() {
            for nested in record.paths() {
                paths.insert(format!("{name}{LOOKUP_SEP}{nested}"));
            }
        }
    }
    paths
}

/// Whether `key` is `path` itself or `path` followed by the separator.
pub fn matches_path(key: &str, path: &str) -> bool {
    match key.strip_prefix(path) {
        Some("") => true,
        Some(rest) => rest.starts_with(LOOKUP_SEP),
        None => false,
    }
}

/// Reject the first key that no path matches.
pub fn validate_keys<'k>(
    paths: &BTreeSet<String>,
    keys: impl IntoIterator<Item = &'k str>,
) -> Result<()> {
    for key in keys {
        if !paths.iter().any(|path| matches_path(key, path)) {
            return Err(DatalookupError::FilterDoesNotExist {
                filter: key.to_string(),
            });
        }
    }
    Ok(())
}

/// The longest path matching `key`. Equal lengths keep the first path in
/// ascending order.
pub fn best_match<'p>(paths: &'p BTreeSet<String>, key: &str) -> Option<&'p str> {
    let mut best: Option<&str> = None;
    for path in paths {
        if matches_path(key, path) && best.map_or(true, |b| path.len() > b.len()) {
            best = Some(path);
        }
    }
    best
}

/// Split a key into a direct lookup or a forwarded remainder.
///
/// Returns `None` when no path matches.
pub fn resolve_key<'a>(paths: &BTreeSet<String>, key: &'a str) -> Option<ResolvedKey<'a>> {
    let path = best_match(paths, key)?;
    match path.split_once(LOOKUP_SEP) {
        Some((first, _)) => Some(ResolvedKey::Forward {
            field: &key[..first.len()],
            rest: &key[first.len() + LOOKUP_SEP.len()..],
        }),
        None => {
            // `field__` leaves an empty lookup name, which no lookup answers to
            let remainder = &key[path.len()..];
            let lookup = match remainder.strip_prefix(LOOKUP_SEP) {
                Some(lookup) => lookup,
                None => DEFAULT_LOOKUP,
            };
            Some(ResolvedKey::Direct {
                field: &key[..path.len()],
                lookup,
            })
        }
    }
}
