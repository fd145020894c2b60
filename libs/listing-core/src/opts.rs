use std::sync::Arc;

use crate::error::RegistryError;
use crate::field::{FieldKind, Registry};
use crate::filter::{DefaultFilters, FilterOperator};
use crate::page::LimitCfg;
use crate::sort::parse_sort;

/// Per-endpoint listing policy over a shared registry.
#[derive(Clone, Debug)]
pub struct ListOpts {
    pub registry: Arc<Registry>,
    pub default_filters: DefaultFilters,
    pub default_sort: String,
    /// API name of the field matched by `search`.
    pub search_field: Option<&'static str>,
    pub limits: LimitCfg,
    /// Accept `limit=-1` on the paginated path.
    pub allow_unbounded: bool,
    /// Honor `tags` parameters; ignored otherwise.
    pub tags_enabled: bool,
}

impl ListOpts {
    pub fn new(registry: Arc<Registry>) -> Self {
        let default_sort = registry.primary().to_string();
        Self {
            registry,
            default_filters: DefaultFilters::new(),
            default_sort,
            search_field: None,
            limits: LimitCfg::default(),
            allow_unbounded: false,
            tags_enabled: false,
        }
    }

    pub fn default_filter(mut self, field: &str, op: FilterOperator, values: &[&str]) -> Self {
        self.default_filters = self.default_filters.with(field, op, values);
        self
    }

    pub fn default_sort(mut self, sort: impl Into<String>) -> Self {
        self.default_sort = sort.into();
        self
    }

    pub fn search(mut self, field: &'static str) -> Self {
        self.search_field = Some(field);
        self
    }

    pub fn limits(mut self, limits: LimitCfg) -> Self {
        self.limits = limits;
        self
    }

    pub fn allow_unbounded(mut self, allow: bool) -> Self {
        self.allow_unbounded = allow;
        self
    }

    pub fn with_tags(mut self) -> Self {
        self.tags_enabled = true;
        self
    }

    /// Validate defaults and the search field against the registry.
    pub fn build(mut self) -> Result<Self, RegistryError> {
        self.default_filters.validate(&self.registry)?;
        parse_sort(Some(&self.default_sort), &self.registry, "")
            .map_err(|e| RegistryError::InvalidDefaultSort(e.to_string()))?;

        if let Some(name) = self.search_field {
            match self.registry.get(name) {
                Some(f) if f.kind == FieldKind::String && f.sql().is_some() => {}
                _ => return Err(RegistryError::InvalidSearchField(name.to_string())),
            }
        }
        if self.tags_enabled && self.registry.tag_field().is_none() {
            return Err(RegistryError::InvalidTagField(format!(
                "{} has no tag field",
                self.registry.entity()
            )));
        }
        Ok(self)
    }

    /// Expression matched by `search`, if the endpoint supports it.
    pub fn search_sql(&self) -> Option<&str> {
        self.search_field
            .and_then(|name| self.registry.get(name))
            .and_then(|f| f.sql())
    }
}
