//! Error types for Stagetrack
//!
//! One taxonomy shared by the service and route layers:
//! - `NotFound`: absent, or outside the caller's scope via a scoped lookup
//!   (deliberately indistinguishable from true absence).
//! - `Forbidden`: the resource exists and was fetched unscoped, but the
//!   caller's role or ownership check failed.
//! - `Conflict`: domain-rule violation (duplicate edge, duplicate email).
//! - `Database`/`Internal`: unexpected persistence or cascade failure.

use hyper::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TrackError>;

/// Stagetrack error taxonomy
#[derive(Debug, Error)]
pub enum TrackError {
    /// Resource does not exist, or a scoped lookup excluded it
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource exists but role or ownership check failed
    #[error("access denied: {0}")]
    Forbidden(String),

    /// Domain-rule violation, not a storage error
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or missing request data
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication failure (token, password, credentials)
    #[error("authentication error: {0}")]
    Auth(String),

    /// Persistence-layer failure
    #[error("database error: {0}")]
    Database(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackError {
    /// HTTP status this error maps to at the route boundary
    pub fn status(&self) -> StatusCode {
        match self {
            TrackError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackError::Forbidden(_) => StatusCode::FORBIDDEN,
            TrackError::Conflict(_) => StatusCode::CONFLICT,
            TrackError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackError::Auth(_) => StatusCode::UNAUTHORIZED,
            TrackError::Database(_) | TrackError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            TrackError::NotFound(_) => "NOT_FOUND",
            TrackError::Forbidden(_) => "FORBIDDEN",
            TrackError::Conflict(_) => "CONFLICT",
            TrackError::Validation(_) => "VALIDATION",
            TrackError::Auth(_) => "UNAUTHORIZED",
            TrackError::Database(_) => "DB_ERROR",
            TrackError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for TrackError {
    fn from(e: std::io::Error) -> Self {
        TrackError::Internal(format!("IO error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TrackError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TrackError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TrackError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TrackError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrackError::Auth("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TrackError::Database("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_and_forbidden_are_distinct() {
        // The scoped-lookup miss and the unscoped ownership failure must
        // stay distinguishable for callers.
        let nf = TrackError::NotFound("project".into());
        let fb = TrackError::Forbidden("project".into());
        assert_ne!(nf.status(), fb.status());
        assert_ne!(nf.code(), fb.code());
    }
}
