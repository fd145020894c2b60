//! Declarative field registry: API attribute name → backend query expression.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::RegistryError;

/// Whitelisted field kind → used to coerce raw filter strings into typed values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    DateTimeUtc,
}

/// A filter value after coercion against the field kind.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::I64 => "integer",
            FieldKind::F64 => "number",
            FieldKind::Bool => "boolean",
            FieldKind::DateTimeUtc => "RFC 3339 timestamp or YYYY-MM-DD date",
        }
    }

    /// Coerce one raw value. The error is a human-readable reason.
    pub fn coerce(self, raw: &str) -> Result<FilterValue, String> {
        if raw.is_empty() {
            return Err("value must not be empty".to_string());
        }
        let expected = || format!("expected {}", self.name());
        match self {
            FieldKind::String => Ok(FilterValue::String(raw.to_string())),
            FieldKind::I64 => raw
                .trim()
                .parse::<i64>()
                .map(FilterValue::I64)
                .map_err(|_| expected()),
            FieldKind::F64 => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(FilterValue::F64(f)),
                _ => Err(expected()),
            },
            FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(FilterValue::Bool(true)),
                "false" => Ok(FilterValue::Bool(false)),
                _ => Err(expected()),
            },
            FieldKind::DateTimeUtc => parse_timestamp(raw.trim())
                .map(FilterValue::DateTime)
                .ok_or_else(expected),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = s.parse::<NaiveDate>().ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// One externally visible attribute of an entity.
///
/// `expression` is a compile-time constant; request input never reaches it.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub api_name: &'static str,
    pub expression: Option<&'static str>,
    pub kind: FieldKind,
    pub filterable: bool,
    pub sortable: bool,
    /// Selected into result rows and rendered as a CSV column.
    pub output: bool,
    /// Populated from the tag-membership source rather than the row query.
    pub is_tag: bool,
    /// Fallback expression used when `expression` evaluates to NULL.
    pub default: Option<&'static str>,
    resolved: Option<String>,
}

impl FieldDescriptor {
    /// Filterable, sortable, selected column.
    pub fn column(api_name: &'static str, expression: &'static str, kind: FieldKind) -> Self {
        Self {
            api_name,
            expression: Some(expression),
            kind,
            filterable: true,
            sortable: true,
            output: true,
            is_tag: false,
            default: None,
            resolved: None,
        }
    }

    /// Filterable expression that is never selected or sorted on.
    pub fn filter_only(api_name: &'static str, expression: &'static str, kind: FieldKind) -> Self {
        Self {
            sortable: false,
            output: false,
            ..Self::column(api_name, expression, kind)
        }
    }

    /// Tag list attribute, filled from the tag-membership relation.
    pub fn tags(api_name: &'static str) -> Self {
        Self {
            api_name,
            expression: None,
            kind: FieldKind::String,
            filterable: false,
            sortable: false,
            output: true,
            is_tag: true,
            default: None,
            resolved: None,
        }
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn not_sortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Effective SQL fragment, available once the owning registry is built.
    pub fn sql(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    fn resolve(&mut self) {
        self.resolved = self.expression.map(|expr| {
            let expr = wrap(expr);
            match self.default {
                Some(default) => format!("COALESCE({expr}, {default})"),
                None => expr,
            }
        });
    }
}

/// True when the outermost parentheses enclose the whole expression.
fn is_wrapped(t: &str) -> bool {
    if !(t.starts_with('(') && t.ends_with(')')) {
        return false;
    }
    let mut depth = 0i32;
    for (i, ch) in t.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i + 1 < t.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn wrap(expr: &str) -> String {
    let t = expr.trim();
    if !is_wrapped(t) && t.chars().any(char::is_whitespace) {
        format!("({t})")
    } else {
        t.to_string()
    }
}

/// Immutable field registry for one entity type. Built once, shared via `Arc`.
#[derive(Clone, Debug)]
pub struct Registry {
    entity: &'static str,
    primary: &'static str,
    fields: Vec<FieldDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn builder(entity: &'static str, primary: &'static str) -> RegistryBuilder {
        RegistryBuilder {
            entity,
            primary,
            fields: Vec::new(),
        }
    }

    /// Entity type name, used as `type` in list items.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// API name of the primary identifier (tie-break key).
    pub fn primary(&self) -> &'static str {
        self.primary
    }

    pub fn get(&self, api_name: &str) -> Option<&FieldDescriptor> {
        self.index.get(api_name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, api_name: &str) -> bool {
        self.index.contains_key(api_name)
    }

    /// Registration order of a field.
    pub fn position(&self, api_name: &str) -> Option<usize> {
        self.index.get(api_name).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// `(alias, expression)` pairs selected into each row, in registry order.
    pub fn projection(&self) -> Vec<(&'static str, &str)> {
        self.fields
            .iter()
            .filter(|f| f.output && !f.is_tag)
            .filter_map(|f| f.sql().map(|sql| (f.api_name, sql)))
            .collect()
    }

    /// Output column names in registry order; tag fields only when asked.
    pub fn output_columns(&self, with_tags: bool) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.output && (with_tags || !f.is_tag))
            .map(|f| f.api_name)
            .collect()
    }

    pub fn tag_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_tag)
    }
}

pub struct RegistryBuilder {
    entity: &'static str,
    primary: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl RegistryBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut fields = self.fields;

        for (i, f) in fields.iter_mut().enumerate() {
            if index.insert(f.api_name, i).is_some() {
                return Err(RegistryError::DuplicateField(f.api_name.to_string()));
            }
            if f.is_tag {
                if f.expression.is_some() || f.filterable || f.sortable {
                    return Err(RegistryError::InvalidTagField(f.api_name.to_string()));
                }
            } else if f.expression.is_none() {
                return Err(RegistryError::MissingExpression(f.api_name.to_string()));
            }
            f.resolve();
        }

        match index.get(self.primary) {
            Some(&i) if fields[i].sortable => {}
            _ => return Err(RegistryError::InvalidPrimary(self.primary.to_string())),
        }

        Ok(Registry {
            entity: self.entity,
            primary: self.primary,
            fields,
            index,
        })
    }
}
