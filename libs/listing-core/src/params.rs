use url::form_urlencoded;

/// Listing parameters as they arrive on the query string, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
    /// `filter[...]` keys with their values, in request order.
    pub filters: Vec<(String, String)>,
    /// Every `tags` value, in request order.
    pub tags: Vec<String>,
}

/// Drop NUL characters; the database driver rejects them in text parameters.
pub fn strip_invalid_chars(s: &str) -> String {
    s.chars().filter(|&c| c != '\0').collect()
}

impl RawListParams {
    /// Collect listing parameters from a raw (still percent-encoded) query string.
    /// Unrelated parameters are ignored; for scalar parameters the first occurrence wins.
    pub fn from_query(raw_query: Option<&str>) -> Self {
        let mut out = Self::default();
        let Some(raw) = raw_query else {
            return out;
        };

        for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
            let key = strip_invalid_chars(&k);
            let value = strip_invalid_chars(&v);
            match key.as_str() {
                "limit" => {
                    out.limit.get_or_insert(value);
                }
                "offset" => {
                    out.offset.get_or_insert(value);
                }
                "sort" => {
                    out.sort.get_or_insert(value);
                }
                "search" => {
                    out.search.get_or_insert(value);
                }
                "tags" => out.tags.push(value),
                k if k.starts_with("filter[") => out.filters.push((key, value)),
                _ => {}
            }
        }
        out
    }

    /// Search term if present and non-blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
