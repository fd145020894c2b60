use serde::{Deserialize, Serialize};

use crate::error::ListError;
use crate::field::Registry;

pub const MAX_SORT_LEN: usize = 1024;
pub const MAX_SORT_FIELDS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}

/// Parse `sort=-last_upload,display_name`.
///
/// Leading `-` is descending, leading `+` or none is ascending. Empty input
/// falls back to `default_sort`. Repeated fields keep their first occurrence.
pub fn parse_sort(
    raw: Option<&str>,
    registry: &Registry,
    default_sort: &str,
) -> Result<Vec<SortKey>, ListError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let source = raw.unwrap_or(default_sort);

    if source.len() > MAX_SORT_LEN {
        return Err(ListError::TooComplex("sort parameter too long".into()));
    }

    let mut keys: Vec<SortKey> = Vec::new();
    for token in source.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (name, dir) = match token.strip_prefix('-') {
            Some(rest) => (rest, SortDir::Desc),
            None => (token.strip_prefix('+').unwrap_or(token), SortDir::Asc),
        };

        match registry.get(name) {
            Some(f) if f.sortable && f.sql().is_some() => {}
            _ => return Err(ListError::UnknownSortField(name.to_string())),
        }

        if keys.iter().any(|k| k.field == name) {
            continue;
        }
        keys.push(SortKey {
            field: name.to_string(),
            dir,
        });
    }

    if keys.len() > MAX_SORT_FIELDS {
        return Err(ListError::TooComplex("too many sort fields".into()));
    }
    Ok(keys)
}

/// Append `primary` ascending unless the order already names it.
pub fn with_tiebreaker(mut keys: Vec<SortKey>, primary: &str) -> Vec<SortKey> {
    if !keys.iter().any(|k| k.field == primary) {
        keys.push(SortKey::asc(primary));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDescriptor, FieldKind};

    fn registry() -> Registry {
        Registry::builder("system", "id")
            .field(FieldDescriptor::column("id", "sp.inventory_id", FieldKind::String))
            .field(FieldDescriptor::column("display_name", "sp.display_name", FieldKind::String))
            .field(FieldDescriptor::column("last_upload", "sp.last_upload", FieldKind::DateTimeUtc))
            .field(
                FieldDescriptor::column("enabled", "NOT sp.opt_out", FieldKind::Bool).not_sortable(),
            )
            .field(FieldDescriptor::tags("tags"))
            .build()
            .unwrap()
    }

    #[test]
    fn directions_and_priority() {
        let r = registry();
        let keys = parse_sort(Some("-last_upload, +display_name,id"), &r, "id").unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey::desc("last_upload"),
                SortKey::asc("display_name"),
                SortKey::asc("id"),
            ]
        );
    }

    #[test]
    fn empty_input_uses_default() {
        let r = registry();
        assert_eq!(
            parse_sort(None, &r, "-last_upload").unwrap(),
            vec![SortKey::desc("last_upload")]
        );
        assert_eq!(
            parse_sort(Some("  "), &r, "-last_upload").unwrap(),
            vec![SortKey::desc("last_upload")]
        );
    }

    #[test]
    fn unknown_and_unsortable_fields_fail() {
        let r = registry();
        assert_eq!(
            parse_sort(Some("bogus"), &r, "id"),
            Err(ListError::UnknownSortField("bogus".into()))
        );
        assert_eq!(
            parse_sort(Some("-enabled"), &r, "id"),
            Err(ListError::UnknownSortField("enabled".into()))
        );
        assert_eq!(
            parse_sort(Some("tags"), &r, "id"),
            Err(ListError::UnknownSortField("tags".into()))
        );
    }

    #[test]
    fn duplicates_keep_first_direction() {
        let r = registry();
        let keys = parse_sort(Some("-id,id"), &r, "id").unwrap();
        assert_eq!(keys, vec![SortKey::desc("id")]);
    }

    #[test]
    fn tiebreaker_is_appended_once() {
        let keys = with_tiebreaker(vec![SortKey::desc("last_upload")], "id");
        assert_eq!(keys, vec![SortKey::desc("last_upload"), SortKey::asc("id")]);

        let keys = with_tiebreaker(vec![SortKey::desc("id")], "id");
        assert_eq!(keys, vec![SortKey::desc("id")]);
    }
}
