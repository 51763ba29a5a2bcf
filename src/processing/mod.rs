//! Schema normalization and gold publishing.
//!
//! The processing layer turns the [`crate::types::RawTable`] produced by ingestion into
//! [`crate::types::CanonicalRecord`]s and persists them.
//!
//! - [`mapping`]: declarative per-source [`SchemaMapping`]s (built-in or loaded from JSON)
//! - [`normalize()`]: applies a mapping to a raw table (long rename or wide un-pivot)
//! - [`GoldStore`]: writes one canonical file per source, replacing prior output
//! - [`SourceNormalizer`]: the per-source transform unit combining the above
//!
//! ## Example: normalize a Treasury row
//!
//! ```rust
//! use rate_curves::processing::{mapping, normalize};
//! use rate_curves::types::{RawTable, Tenor};
//!
//! let treasury = mapping::builtin()
//!     .into_iter()
//!     .find(|m| m.source_id == "treasury")
//!     .unwrap();
//! let raw = RawTable::new(
//!     vec!["Date".into(), "1 Mo".into(), "2 Mo".into()],
//!     vec![vec!["01/02/2025".into(), "4.45".into(), "4.41".into()]],
//! );
//!
//! let out = normalize(&raw, &treasury).unwrap();
//! assert_eq!(out.row_count(), 2);
//! assert_eq!(out.records[1].tenor, Some(Tenor::Label("2 Mo".into())));
//! assert_eq!(out.records[1].rate, Some(4.41));
//! ```

pub mod gold;
pub mod mapping;
pub mod normalize;
mod normalizer;
pub mod parse;

pub use gold::{GoldFormat, GoldStore};
pub use mapping::{Coercion, ColumnRule, DateOrder, Layout, SchemaMapping};
pub use normalize::normalize;
pub use normalizer::SourceNormalizer;
