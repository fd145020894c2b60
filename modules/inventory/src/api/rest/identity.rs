//! Tenant identity carried as a request extension.

use apikit::{from_parts, ProblemResponse};
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Header read by [`trusted_account_header`].
pub const ACCOUNT_HEADER: &str = "x-rh-account-id";

/// Account every listing query is scoped to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountId(pub String);

impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let res = parts.extensions.get::<AccountId>().cloned().ok_or_else(|| {
            from_parts(
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Unauthorized",
                "Request carries no tenant identity",
                parts.uri.path(),
            )
        });
        async move { res }
    }
}

/// Middleware that trusts `x-rh-account-id` as set by an upstream gateway.
///
/// Only suitable behind a proxy that strips the header from client traffic.
pub async fn trusted_account_header(mut req: Request, next: Next) -> Response {
    let account = req
        .headers()
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| AccountId(s.to_string()));
    if let Some(account) = account {
        req.extensions_mut().insert(account);
    }
    next.run(req).await
}
