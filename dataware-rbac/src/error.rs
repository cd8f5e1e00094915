//! Error types for permission management
//!
//! Every failure the catalog, the role model or a role store can report.
//! Authorization checks themselves never fail: a missing user or role
//! simply grants nothing.

use thiserror::Error;

use crate::roles::RoleId;

/// Permission management error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// Action identifier is not registered in the catalog
    #[error("Action {0} does not exist")]
    ActionNotFound(String),

    /// Role does not exist
    #[error("Role {0} does not exist")]
    RoleNotFound(RoleId),

    /// Permission data references unregistered action identifiers
    #[error("Invalid action identifiers: {}", .0.join(", "))]
    InvalidAction(Vec<String>),

    /// Input has the wrong shape or violates a field constraint
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backing store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for permission management operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    /// Check if this error should be logged at error level.
    ///
    /// Lookup and validation failures are caused by the caller and
    /// are expected.
    pub fn is_server_error(&self) -> bool {
        matches!(self, RbacError::Storage(_))
    }

    /// Check if this error is a lookup failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RbacError::ActionNotFound(_) | RbacError::RoleNotFound(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RbacError::ActionNotFound(_) | RbacError::RoleNotFound(_) => 404,
            RbacError::InvalidAction(_) | RbacError::Validation(_) => 400,
            RbacError::Storage(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RbacError::ActionNotFound(_) => "ACTION_NOT_FOUND",
            RbacError::RoleNotFound(_) => "ROLE_NOT_FOUND",
            RbacError::InvalidAction(_) => "INVALID_ACTION",
            RbacError::Validation(_) => "VALIDATION_ERROR",
            RbacError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<serde_json::Error> for RbacError {
    fn from(err: serde_json::Error) -> Self {
        RbacError::Validation(err.to_string())
    }
}
