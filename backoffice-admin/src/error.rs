//! Error types for admin operations

use backoffice_groups::GroupError;
use backoffice_roles::PermissionMode;
use backoffice_search::SearchError;
use thiserror::Error;

use crate::config::ConfigError;

/// Admin error types.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Registration input was rejected
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown resource, action or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// The principal may not use the target in this mode
    #[error("Permission denied: {mode} {target}")]
    PermissionDenied { mode: PermissionMode, target: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// An action handler reported a failure
    #[error("Action failed: {0}")]
    ActionFailed(String),
}

impl AdminError {
    /// Get HTTP status code for this error.
    ///
    /// Denials answer 404 so that hidden targets are indistinguishable
    /// from missing ones.
    pub fn status_code(&self) -> u16 {
        match self {
            AdminError::Validation(_) => 422,
            AdminError::NotFound(_) | AdminError::PermissionDenied { .. } => 404,
            AdminError::Config(_) => 500,
            AdminError::Group(e) => e.status_code(),
            AdminError::Search(e) => e.status_code(),
            AdminError::ActionFailed(_) => 422,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AdminError::Validation(_) => "VALIDATION_FAILED",
            AdminError::NotFound(_) | AdminError::PermissionDenied { .. } => "NOT_FOUND",
            AdminError::Config(_) => "CONFIG_ERROR",
            AdminError::Group(e) => e.error_code(),
            AdminError::Search(_) => "SEARCH_ERROR",
            AdminError::ActionFailed(_) => "ACTION_FAILED",
        }
    }
}

/// Result type for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;
