//! Listing grammar shared by every list-style endpoint.
//!
//! Everything in this crate is pure: raw query parameters go in, validated
//! value objects (`FilterSpec`, `SortKey`, `TagPredicate`, `PageRequest`)
//! come out. Turning them into SQL belongs to `listing-db`.

pub mod error;
pub mod field;
pub mod filter;
pub mod opts;
pub mod page;
pub mod params;
pub mod plan;
pub mod sort;
pub mod tags;

pub use error::{ListError, RegistryError};
pub use field::{FieldDescriptor, FieldKind, FilterValue, Registry, RegistryBuilder};
pub use filter::{parse_filters, DefaultFilters, FilterOperator, FilterSpec};
pub use opts::ListOpts;
pub use page::{build_links, build_meta, LimitCfg, Links, ListPage, PageMeta, PageRequest};
pub use params::{strip_invalid_chars, RawListParams};
pub use plan::{ListMode, ListPlan};
pub use sort::{parse_sort, with_tiebreaker, SortDir, SortKey};
pub use tags::{parse_tags, TagPredicate};
