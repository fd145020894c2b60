use apikit::{from_parts, list_error_to_problem, ProblemResponse};
use axum::http::StatusCode;

use crate::domain::error::DomainError;

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Listing(err) => list_error_to_problem(err, instance),
        DomainError::AdvisoryNotFound { name } => from_parts(
            StatusCode::NOT_FOUND,
            "ADVISORY_NOT_FOUND",
            "Advisory not found",
            format!("Advisory '{name}' was not found"),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    }
}
