//! `filter[field]...` grammar → validated `FilterSpec` list.

use std::collections::HashSet;

use crate::error::{ListError, RegistryError};
use crate::field::{FieldDescriptor, FieldKind, FilterValue, Registry};

pub const MAX_FILTERS: usize = 64;
pub const MAX_FILTER_VALUES: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    In,
}

impl FilterOperator {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            "lt" => Self::Lt,
            "le" => Self::Le,
            "like" => Self::Like,
            "in" => Self::In,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Like => "like",
            Self::In => "in",
        }
    }

    pub fn allowed_for(self, kind: FieldKind) -> bool {
        match self {
            Self::Eq | Self::Ne | Self::In => true,
            Self::Like => kind == FieldKind::String,
            Self::Gt | Self::Ge | Self::Lt | Self::Le => kind != FieldKind::Bool,
        }
    }

    fn merges_into_in(self) -> bool {
        matches!(self, Self::Eq | Self::In)
    }
}

/// One validated filter. Values OR together for `in`; specs AND together.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterSpec {
    pub field: String,
    pub op: FilterOperator,
    pub values: Vec<String>,
}

impl FilterSpec {
    pub fn new(field: impl Into<String>, op: FilterOperator, values: Vec<String>) -> Self {
        Self {
            field: field.into(),
            op,
            values,
        }
    }

    /// Typed values for the given field kind.
    pub fn coerce(&self, kind: FieldKind) -> Result<Vec<FilterValue>, ListError> {
        self.values
            .iter()
            .map(|v| {
                kind.coerce(v)
                    .map_err(|reason| ListError::invalid_value(&self.field, v, reason))
            })
            .collect()
    }
}

/// Filters applied when the request carries no explicit filter for the field.
#[derive(Clone, Debug, Default)]
pub struct DefaultFilters(Vec<FilterSpec>);

impl DefaultFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, op: FilterOperator, values: &[&str]) -> Self {
        self.0.push(FilterSpec::new(
            field,
            op,
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterSpec> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every default against the registry and order them by registration.
    pub fn validate(&mut self, registry: &Registry) -> Result<(), RegistryError> {
        for spec in &self.0 {
            let invalid = |reason: String| RegistryError::InvalidDefaultFilter {
                field: spec.field.clone(),
                reason,
            };
            let f = registry
                .get(&spec.field)
                .ok_or_else(|| invalid("unknown field".into()))?;
            check_field(f, spec.op).map_err(|e| invalid(e.to_string()))?;
            if spec.values.is_empty() {
                return Err(invalid("no values".into()));
            }
            spec.coerce(f.kind).map_err(|e| invalid(e.to_string()))?;
        }
        self.0
            .sort_by_key(|s| registry.position(&s.field).unwrap_or(usize::MAX));
        Ok(())
    }
}

fn check_field(f: &FieldDescriptor, op: FilterOperator) -> Result<(), ListError> {
    if !f.filterable || f.sql().is_none() {
        return Err(ListError::FieldNotFilterable(f.api_name.to_string()));
    }
    if !op.allowed_for(f.kind) {
        return Err(ListError::invalid_operator(f.api_name, op.as_str()));
    }
    Ok(())
}

/// `filter[a][b][op]` → `["a", "b", "op"]`. `None` for malformed keys.
fn split_key(key: &str) -> Option<Vec<&str>> {
    let mut rest = key.strip_prefix("filter")?;
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        let seg = &inner[..end];
        if seg.is_empty() {
            return None;
        }
        segments.push(seg);
        rest = &inner[end + 1..];
    }
    (!segments.is_empty()).then_some(segments)
}

/// Resolve bracket segments to a registry field and an optional explicit operator.
///
/// A trailing operator name wins when the preceding path names a field.
fn resolve<'r>(
    segments: &[&str],
    registry: &'r Registry,
) -> Result<(&'r FieldDescriptor, Option<FilterOperator>), ListError> {
    let split = segments
        .split_last()
        .filter(|(_, head)| !head.is_empty())
        .map(|(last, head)| (*last, head.join(".")));

    if let Some((last, prefix)) = &split {
        if let (Some(op), Some(f)) = (FilterOperator::parse(last), registry.get(prefix)) {
            return Ok((f, Some(op)));
        }
    }

    let full = segments.join(".");
    if let Some(f) = registry.get(&full) {
        return Ok((f, None));
    }
    match split {
        Some((last, prefix)) if registry.contains(&prefix) => {
            Err(ListError::invalid_operator(prefix, last))
        }
        _ => Err(ListError::UnknownFilterField(full)),
    }
}

/// Parse `filter[...]` pairs into validated specs, then inject defaults for
/// fields the request did not mention.
///
/// Repeated `eq`/`in` values on a field merge into a single `in`; any other
/// repeated operator produces one spec per value.
pub fn parse_filters(
    pairs: &[(String, String)],
    registry: &Registry,
    defaults: &DefaultFilters,
) -> Result<Vec<FilterSpec>, ListError> {
    let mut specs: Vec<FilterSpec> = Vec::new();

    for (key, raw) in pairs {
        let segments =
            split_key(key).ok_or_else(|| ListError::UnknownFilterField(key.clone()))?;
        let (field, explicit) = resolve(&segments, registry)?;
        let op = explicit.unwrap_or(FilterOperator::Eq);
        check_field(field, op)?;

        let values: Vec<String> = if op == FilterOperator::In {
            raw.split(',').map(str::to_string).collect()
        } else {
            vec![raw.clone()]
        };
        for v in &values {
            field
                .kind
                .coerce(v)
                .map_err(|reason| ListError::invalid_value(field.api_name, v, reason))?;
        }

        let merge_target = op.merges_into_in().then(|| {
            specs
                .iter_mut()
                .find(|s| s.field == field.api_name && s.op.merges_into_in())
        });
        match merge_target.flatten() {
            Some(existing) => {
                existing.op = FilterOperator::In;
                existing.values.extend(values);
                if existing.values.len() > MAX_FILTER_VALUES {
                    return Err(ListError::TooComplex(format!(
                        "more than {MAX_FILTER_VALUES} values for '{}'",
                        field.api_name
                    )));
                }
            }
            None => {
                if values.len() > MAX_FILTER_VALUES {
                    return Err(ListError::TooComplex(format!(
                        "more than {MAX_FILTER_VALUES} values for '{}'",
                        field.api_name
                    )));
                }
                specs.push(FilterSpec::new(field.api_name, op, values));
            }
        }

        if specs.len() > MAX_FILTERS {
            return Err(ListError::TooComplex(format!(
                "more than {MAX_FILTERS} filters"
            )));
        }
    }

    let explicit: HashSet<String> = specs.iter().map(|s| s.field.clone()).collect();
    specs.extend(
        defaults
            .iter()
            .filter(|d| !explicit.contains(&d.field))
            .cloned(),
    );

    Ok(specs)
}
