use serde::{Deserialize, Serialize};

use crate::error::ListError;

pub const MAX_TAGS: usize = 32;

/// `namespace/key=value` or `namespace/key`. All predicates must hold for the same entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPredicate {
    pub namespace: String,
    pub key: String,
    pub value: Option<String>,
}

impl TagPredicate {
    pub fn parse(raw: &str) -> Result<Self, ListError> {
        let bad = || ListError::InvalidTagFormat(raw.to_string());

        let (namespace, rest) = raw.split_once('/').ok_or_else(bad)?;
        let (key, value) = match rest.split_once('=') {
            Some((k, v)) => (k, Some(v.to_string())),
            None => (rest, None),
        };
        if namespace.trim().is_empty() || key.trim().is_empty() {
            return Err(bad());
        }

        Ok(Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        })
    }
}

/// Parse every `tags` parameter. One malformed token rejects the whole request.
pub fn parse_tags(raw: &[String]) -> Result<Vec<TagPredicate>, ListError> {
    if raw.len() > MAX_TAGS {
        return Err(ListError::TooComplex(format!("more than {MAX_TAGS} tags")));
    }
    raw.iter().map(|t| TagPredicate::parse(t)).collect()
}
