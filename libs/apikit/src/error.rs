use axum::http::StatusCode;
use listing_core::ListError;

use crate::problem::{from_parts, ProblemResponse};

/// Stable machine code for each listing error.
pub fn error_code(e: &ListError) -> &'static str {
    match e {
        ListError::UnknownFilterField(_) => "UNKNOWN_FILTER_FIELD",
        ListError::FieldNotFilterable(_) => "FIELD_NOT_FILTERABLE",
        ListError::InvalidOperator { .. } => "INVALID_OPERATOR",
        ListError::InvalidFilterValue { .. } => "INVALID_FILTER_VALUE",
        ListError::UnknownSortField(_) => "UNKNOWN_SORT_FIELD",
        ListError::InvalidTagFormat(_) => "INVALID_TAG_FORMAT",
        ListError::InvalidPagination(_) => "INVALID_PAGINATION",
        ListError::TooComplex(_) => "QUERY_TOO_COMPLEX",
        ListError::UnsupportedContentType(_) => "UNSUPPORTED_CONTENT_TYPE",
        ListError::NotFound(_) => "NOT_FOUND",
        ListError::QueryExecution(_) => "INTERNAL_DB",
        ListError::Serialization(_) => "INTERNAL_SERIALIZATION",
    }
}

/// Map a listing error to an RFC 9457 response.
///
/// Server-side failures are logged here and answered with a generic detail.
pub fn list_error_to_problem(e: &ListError, instance: &str) -> ProblemResponse {
    let code = error_code(e);
    match e {
        ListError::UnsupportedContentType(_) => from_parts(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            code,
            "Unsupported content type",
            e.to_string(),
            instance,
        ),
        ListError::NotFound(_) => {
            from_parts(StatusCode::NOT_FOUND, code, "Not found", e.to_string(), instance)
        }
        ListError::QueryExecution(_) => {
            tracing::error!(error = %e, instance, "listing query failed");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
        ListError::Serialization(_) => {
            tracing::error!(error = %e, instance, "listing response could not be rendered");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Internal error",
                "The response could not be rendered",
                instance,
            )
        }
        _ => from_parts(
            StatusCode::BAD_REQUEST,
            code,
            "Invalid listing parameters",
            e.to_string(),
            instance,
        ),
    }
}
