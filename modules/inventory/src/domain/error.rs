use listing_core::ListError;
use thiserror::Error;

/// Domain-specific errors for the inventory listings.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Listing(#[from] ListError),

    #[error("Advisory not found: {name}")]
    AdvisoryNotFound { name: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn advisory_not_found(name: impl Into<String>) -> Self {
        Self::AdvisoryNotFound { name: name.into() }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
