//! Error types for search operations

use thiserror::Error;

use crate::schema::FieldKind;

/// Search error types.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The requested record does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A bound value has no mapping for the executing backend
    #[error("Unsupported query value: {0}")]
    UnsupportedValue(String),

    /// The database rejected the query
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SearchError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::NotFound(_) => 404,
            SearchError::UnsupportedValue(_) => 500,
            #[cfg(feature = "sqlite")]
            SearchError::Database(_) => 500,
        }
    }
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Reasons a search attribute or filter could not become a condition.
///
/// These never fail a search: the offending condition is logged and
/// skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown field `{field}` on model `{model}`")]
    UnknownField { model: String, field: String },

    #[error("`{name}` on model `{model}` is not a relationship")]
    UnknownRelationship { model: String, name: String },

    #[error("model `{0}` is not registered")]
    UnknownModel(String),

    #[error("`{value}` is not a valid {kind}")]
    InvalidValue { kind: FieldKind, value: String },
}
