//! Service error taxonomy and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use propagator_metadata::MetadataError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Failures surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ServiceError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::InvalidPath(_) => "invalid_path",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidPath(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<MetadataError> for ServiceError {
    fn from(err: MetadataError) -> Self {
        if err.is_unavailable() {
            Self::StoreUnavailable(err.to_string())
        } else if err.is_conflict() {
            Self::Conflict(err.to_string())
        } else if let MetadataError::NotFound(what) = err {
            Self::NotFound(what)
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<propagator_core::Error> for ServiceError {
    fn from(err: propagator_core::Error) -> Self {
        match err {
            propagator_core::Error::InvalidPath(msg) => Self::InvalidPath(msg),
            propagator_core::Error::InvalidToken(msg) => Self::Unauthenticated(msg),
            propagator_core::Error::TokenExpired => Self::Unauthenticated("token expired".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for service operations and handlers.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_errors_classified() {
        let unavailable = ServiceError::from(MetadataError::Io(std::io::Error::other("reset")));
        assert_eq!(unavailable.code(), "store_unavailable");
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let conflict = ServiceError::from(MetadataError::Constraint("taken".to_string()));
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let internal = ServiceError::from(MetadataError::Internal("broken".to_string()));
        assert_eq!(internal.code(), "internal_error");
    }

    #[test]
    fn test_core_errors_classified() {
        let err = ServiceError::from(propagator_core::Error::InvalidPath("x".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ServiceError::from(propagator_core::Error::TokenExpired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
