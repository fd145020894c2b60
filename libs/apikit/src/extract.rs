use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use listing_core::RawListParams;

use crate::error::list_error_to_problem;
use crate::negotiate::ResponseFormat;
use crate::problem::ProblemResponse;

/// Listing parameters, request path and negotiated format of one request.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub params: RawListParams,
    /// Path without query; base for pagination links and problem instances.
    pub path: String,
    pub raw_query: Option<String>,
    pub format: ResponseFormat,
}

impl ListRequest {
    pub fn from_parts(parts: &Parts) -> Result<Self, ProblemResponse> {
        let path = parts.uri.path().to_string();
        let raw_query = parts.uri.query().map(str::to_string);
        let format = ResponseFormat::from_headers(&parts.headers)
            .map_err(|e| list_error_to_problem(&e, &path))?;

        Ok(Self {
            params: RawListParams::from_query(raw_query.as_deref()),
            path,
            raw_query,
            format,
        })
    }
}

impl<S> FromRequestParts<S> for ListRequest
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let res = ListRequest::from_parts(parts);
        async move { res }
    }
}
