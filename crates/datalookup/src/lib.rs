//! In-memory lookups over nested JSON records.
//!
//! A decoded JSON document is turned into a [`RecordSet`]: every object
//! becomes a [`Record`] whose fields are classified as scalars, arrays,
//! nested records or record collections. Records are then selected with
//! Django-style keys where a field path is optionally followed by a lookup
//! name, all joined by `__`:
//!
//! ```
//! use datalookup::{FilterValue, RecordSet};
//! use serde_json::json;
//!
//! let authors = RecordSet::new(json!([
//!     {"id": 1, "author": "J. K. Rowling", "books": [{"genre": "Fantasy"}]},
//!     {"id": 2, "author": "Agatha Christie", "books": [{"genre": "Mystery"}]},
//! ]))?;
//!
//! let fantasy = authors.filter([("books__genre__iexact", "fantasy")])?;
//! assert_eq!(fantasy.len(), 1);
//!
//! let others = authors.exclude([("id__lt", FilterValue::from(2))])?;
//! assert_eq!(others[0].value_of("author")?, json!("Agatha Christie"));
//! # Ok::<(), datalookup::DatalookupError>(())
//! ```
//!
//! Lookups are registered per field kind in a [`LookupRegistry`]; the
//! process-wide registry comes pre-loaded with the built-in families and
//! can be extended with [`register_lookup`].

mod error;
mod field;
mod filters;
pub mod lookup;
pub mod path;
mod record;
mod record_set;

pub use error::{DatalookupError, Result};
pub use field::{Field, FieldValue};
pub use filters::{FilterType, FilterValue, Filters};
pub use lookup::{register_lookup, registry, Lookup, LookupRegistry, LookupTarget};
pub use path::{LOOKUP_SEP, RELATED_SEP};
pub use record::Record;
pub use record_set::{RecordSet, REPR_OUTPUT_SIZE};
