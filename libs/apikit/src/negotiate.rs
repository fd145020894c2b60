//! `Accept` header negotiation between JSON and CSV.

use axum::http::{header, HeaderMap};
use listing_core::ListError;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_CSV: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Csv,
}

impl ResponseFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ResponseFormat::Json => APPLICATION_JSON,
            ResponseFormat::Csv => TEXT_CSV,
        }
    }

    /// Pick a format from a raw `Accept` value.
    ///
    /// JSON wins when both types are listed. Anything naming neither type,
    /// including a missing header and bare wildcards, is rejected.
    pub fn negotiate(accept: Option<&str>) -> Result<Self, ListError> {
        let raw = accept.map(str::trim).unwrap_or("");
        let ct = raw.to_lowercase();

        if ct.contains(APPLICATION_JSON) {
            Ok(ResponseFormat::Json)
        } else if ct.contains(TEXT_CSV) {
            Ok(ResponseFormat::Csv)
        } else {
            Err(ListError::UnsupportedContentType(raw.to_string()))
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ListError> {
        match headers.get(header::ACCEPT) {
            None => Self::negotiate(None),
            Some(v) => match v.to_str() {
                Ok(s) => Self::negotiate(Some(s)),
                Err(_) => Err(ListError::UnsupportedContentType(
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )),
            },
        }
    }
}
