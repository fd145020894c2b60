//! Full request validation: raw parameters → one immutable `ListPlan`.

use crate::error::ListError;
use crate::filter::{parse_filters, FilterSpec};
use crate::opts::ListOpts;
use crate::page::PageRequest;
use crate::params::RawListParams;
use crate::sort::{parse_sort, with_tiebreaker, SortKey};
use crate::tags::{parse_tags, TagPredicate};

pub const MAX_SEARCH_LEN: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    /// Count + one bounded page.
    List,
    /// Every matching row, sorted, no count.
    Export,
}

/// Everything a query needs, validated. Building one never touches the database.
#[derive(Clone, Debug, PartialEq)]
pub struct ListPlan {
    pub mode: ListMode,
    pub search: Option<String>,
    pub tags: Vec<TagPredicate>,
    pub filters: Vec<FilterSpec>,
    /// Effective order including the primary-key tie-break.
    pub sort: Vec<SortKey>,
    /// `None` in export mode.
    pub page: Option<PageRequest>,
}

impl ListPlan {
    pub fn list(opts: &ListOpts, params: &RawListParams) -> Result<Self, ListError> {
        Self::build(opts, params, ListMode::List)
    }

    pub fn export(opts: &ListOpts, params: &RawListParams) -> Result<Self, ListError> {
        Self::build(opts, params, ListMode::Export)
    }

    pub fn build(
        opts: &ListOpts,
        params: &RawListParams,
        mode: ListMode,
    ) -> Result<Self, ListError> {
        let registry = &opts.registry;

        let page = match mode {
            ListMode::List => Some(PageRequest::parse(
                params.limit.as_deref(),
                params.offset.as_deref(),
                opts.limits,
                opts.allow_unbounded,
            )?),
            ListMode::Export => None,
        };

        let search = match (opts.search_field, params.search_term()) {
            (Some(_), Some(term)) if term.chars().count() > MAX_SEARCH_LEN => {
                return Err(ListError::TooComplex(format!(
                    "search longer than {MAX_SEARCH_LEN} characters"
                )))
            }
            (Some(_), Some(term)) => Some(term.to_string()),
            _ => None,
        };

        let tags = if opts.tags_enabled {
            parse_tags(&params.tags)?
        } else {
            Vec::new()
        };

        let filters = parse_filters(&params.filters, registry, &opts.default_filters)?;
        let sort = parse_sort(params.sort.as_deref(), registry, &opts.default_sort)?;
        let sort = with_tiebreaker(sort, registry.primary());

        Ok(Self {
            mode,
            search,
            tags,
            filters,
            sort,
            page,
        })
    }
}
