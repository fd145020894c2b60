use thiserror::Error;

/// Request-level listing errors.
///
/// Everything except `QueryExecution`, `Serialization` and `NotFound` is a
/// client mistake detected before the database is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListError {
    #[error("unknown filter field: {0}")]
    UnknownFilterField(String),

    #[error("field '{0}' cannot be filtered")]
    FieldNotFilterable(String),

    #[error("operator '{op}' is not allowed for field '{field}'")]
    InvalidOperator { field: String, op: String },

    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidFilterValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("unknown or unsortable sort field: {0}")]
    UnknownSortField(String),

    #[error("invalid tag '{0}': expected namespace/key=value or namespace/key")]
    InvalidTagFormat(String),

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("query too complex: {0}")]
    TooComplex(String),

    #[error("unsupported content type '{0}', use 'application/json' or 'text/csv'")]
    UnsupportedContentType(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("query execution failed: {0}")]
    QueryExecution(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ListError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFilterValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operator(field: impl Into<String>, op: impl Into<String>) -> Self {
        Self::InvalidOperator {
            field: field.into(),
            op: op.into(),
        }
    }

    /// True for errors caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::QueryExecution(_) | Self::Serialization(_))
    }
}

/// Registry construction failures. Raised once at startup, never per request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    #[error("field '{0}' is filterable or sortable but has no expression")]
    MissingExpression(String),

    #[error("tag field '{0}' must not declare an expression or be filterable/sortable")]
    InvalidTagField(String),

    #[error("primary field '{0}' is not registered or not sortable")]
    InvalidPrimary(String),

    #[error("default filter on '{field}' is invalid: {reason}")]
    InvalidDefaultFilter { field: String, reason: String },

    #[error("default sort is invalid: {0}")]
    InvalidDefaultSort(String),

    #[error("search field '{0}' is not a string field with an expression")]
    InvalidSearchField(String),
}
