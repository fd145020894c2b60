use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::ListError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitCfg {
    pub default: u64,
    pub max: u64,
}

impl Default for LimitCfg {
    fn default() -> Self {
        Self {
            default: 20,
            max: 1000,
        }
    }
}

/// Absent → configured default; above max → max.
pub fn clamp_limit(req: Option<i64>, cfg: LimitCfg) -> i64 {
    let max = i64::try_from(cfg.max).unwrap_or(i64::MAX);
    let default = i64::try_from(cfg.default).unwrap_or(max).min(max);
    match req {
        None => default,
        Some(l) if l > max => max,
        Some(l) => l,
    }
}

/// Offset/limit window. `limit == -1` means no bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub const UNBOUNDED: i64 = -1;

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Validate raw `limit`/`offset` parameters.
    pub fn parse(
        limit: Option<&str>,
        offset: Option<&str>,
        cfg: LimitCfg,
        allow_unbounded: bool,
    ) -> Result<Self, ListError> {
        let limit = limit
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    ListError::InvalidPagination(format!("limit '{raw}' is not an integer"))
                })
            })
            .transpose()?;
        let offset = offset
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    ListError::InvalidPagination(format!("offset '{raw}' is not an integer"))
                })
            })
            .transpose()?
            .unwrap_or(0);

        match limit {
            Some(Self::UNBOUNDED) if !allow_unbounded => {
                return Err(ListError::InvalidPagination(
                    "limit -1 is not allowed for this resource".into(),
                ))
            }
            Some(l) if l < Self::UNBOUNDED => {
                return Err(ListError::InvalidPagination(format!(
                    "limit must be >= 0, got {l}"
                )))
            }
            _ => {}
        }
        if offset < 0 {
            return Err(ListError::InvalidPagination(format!(
                "offset must be >= 0, got {offset}"
            )));
        }

        let limit = match limit {
            Some(Self::UNBOUNDED) => Self::UNBOUNDED,
            other => clamp_limit(other, cfg),
        };
        Ok(Self { limit, offset })
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit == Self::UNBOUNDED
    }

    /// `LIMIT` value for the query; `None` when unbounded.
    pub fn sql_limit(&self) -> Option<u64> {
        u64::try_from(self.limit).ok()
    }

    pub fn sql_offset(&self) -> u64 {
        u64::try_from(self.offset).unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total_items: u64,
    pub limit: i64,
    pub offset: i64,
}

pub fn build_meta(total: u64, page: PageRequest) -> PageMeta {
    PageMeta {
        total_items: total,
        limit: page.limit,
        offset: page.offset,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    pub first: String,
    pub last: String,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// One page of rows plus its counters.
#[derive(Clone, Debug)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> ListPage<T> {
    pub fn new(items: Vec<T>, meta: PageMeta) -> Self {
        Self { items, meta }
    }

    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> ListPage<U> {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Navigation links for `meta`, preserving every other query parameter in order.
pub fn build_links(base_path: &str, raw_query: Option<&str>, meta: &PageMeta) -> Links {
    let total = i64::try_from(meta.total_items).unwrap_or(i64::MAX);
    let limit = meta.limit;
    let offset = meta.offset;
    let top = (total - 1).max(0);

    let (last, next, previous) = if limit > 0 {
        let last = top / limit * limit;
        let next = (offset.saturating_add(limit) < total).then(|| offset + limit);
        let previous = (offset > 0).then(|| (offset - limit).max(0).min(last));
        (last, next, previous)
    } else {
        (0, None, (offset > 0).then_some(0))
    };

    let link = |off: i64| page_link(base_path, raw_query.unwrap_or(""), limit, off.clamp(0, top));

    Links {
        first: link(0),
        last: link(last),
        next: next.map(link),
        previous: previous.map(link),
    }
}

fn page_link(base_path: &str, raw_query: &str, limit: i64, offset: i64) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    let (mut saw_limit, mut saw_offset) = (false, false);

    for (k, v) in form_urlencoded::parse(raw_query.as_bytes()) {
        match k.as_ref() {
            "offset" => {
                if !saw_offset {
                    out.append_pair("offset", &offset.to_string());
                    saw_offset = true;
                }
            }
            "limit" => {
                if !saw_limit {
                    out.append_pair("limit", &limit.to_string());
                    saw_limit = true;
                }
            }
            _ => {
                out.append_pair(&k, &v);
            }
        }
    }
    if !saw_offset {
        out.append_pair("offset", &offset.to_string());
    }
    if !saw_limit {
        out.append_pair("limit", &limit.to_string());
    }

    format!("{base_path}?{}", out.finish())
}
