//! Error types for group operations
//!
//! This module defines the errors group validation, lookup and persistence
//! can produce.

use thiserror::Error;

/// Group error types.
#[derive(Debug, Error)]
pub enum GroupError {
    /// Input failed validation (blank name, empty ID list, missing principal)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No group matched the requested ID(s)
    #[error("Group not found: {0}")]
    NotFound(String),

    /// A write conflicted with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored permissions could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database rejected a query or transaction
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GroupError {
    /// Check if this is a server error (vs client error).
    pub fn is_server_error(&self) -> bool {
        match self {
            GroupError::Validation(_) | GroupError::NotFound(_) | GroupError::Conflict(_) => false,
            GroupError::Serialization(_) => true,
            #[cfg(feature = "sqlite")]
            GroupError::Database(_) => true,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GroupError::Validation(_) => 422,
            GroupError::NotFound(_) => 404,
            GroupError::Conflict(_) => 409,
            GroupError::Serialization(_) => 500,
            #[cfg(feature = "sqlite")]
            GroupError::Database(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            GroupError::Validation(_) => "VALIDATION_FAILED",
            GroupError::NotFound(_) => "GROUP_NOT_FOUND",
            GroupError::Conflict(_) => "CONFLICT",
            GroupError::Serialization(_) => "SERIALIZATION_ERROR",
            #[cfg(feature = "sqlite")]
            GroupError::Database(_) => "PERSISTENCE_ERROR",
        }
    }
}

/// Result type for group operations.
pub type GroupResult<T> = Result<T, GroupError>;
