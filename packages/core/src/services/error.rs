//! Service Layer Error Types
//!
//! This module defines the error taxonomy surfaced by every store operation.
//! Errors from nested collaborators are converted, never swallowed.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use crate::utils::RenderError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum SpaceServiceError {
    /// Space, page or content lookup miss
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Unique-key collision (space key/name, content `(page, lang, version)`)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status value outside the recognized set
    #[error("Invalid status: {0}")]
    InvalidStatus(ValidationError),

    /// Draft or patch failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// Structural operation against a space that does not exist
    #[error("Invalid scope: space {space_id} does not exist")]
    InvalidScope { space_id: i64 },

    /// Structural operation crossing space boundaries
    #[error("Scope mismatch: node {node_id} belongs to space {actual}, not space {expected}")]
    ScopeMismatch {
        node_id: i64,
        expected: i64,
        actual: i64,
    },

    /// Content renderer failed
    #[error("Render failed: {0}")]
    RenderFailed(#[from] RenderError),

    /// Underlying transaction or IO error
    #[error("Storage failure: {0}")]
    StorageFailure(DatabaseError),
}

impl SpaceServiceError {
    /// Create a not found error
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a scope mismatch error
    pub fn scope_mismatch(node_id: i64, expected: i64, actual: i64) -> Self {
        Self::ScopeMismatch {
            node_id,
            expected,
            actual,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<DatabaseError> for SpaceServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation { context } => Self::Conflict(context),
            other => Self::StorageFailure(other),
        }
    }
}

impl From<ValidationError> for SpaceServiceError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidStatus { .. } => Self::InvalidStatus(err),
            other => Self::Validation(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err: SpaceServiceError = DatabaseError::UniqueViolation {
            context: "spaces.space_key".to_string(),
        }
        .into();
        assert!(err.is_conflict());

        let err: SpaceServiceError = DatabaseError::sql_execution("disk I/O error").into();
        assert!(matches!(err, SpaceServiceError::StorageFailure(_)));
    }

    #[test]
    fn test_status_errors_keep_their_category() {
        let err: SpaceServiceError = ValidationError::invalid_status("page", "archived").into();
        assert!(matches!(err, SpaceServiceError::InvalidStatus(_)));

        let err: SpaceServiceError = ValidationError::missing_field("name").into();
        assert!(matches!(err, SpaceServiceError::Validation(_)));
    }
}
