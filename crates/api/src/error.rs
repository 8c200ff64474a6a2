//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; their details never reach
//! the caller.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::customers::CustomerError;
use crate::services::validation::{Violation, Violations};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// No authenticated client.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The authenticated client may not perform this action.
    #[error("Access denied")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting client already manages this customer.
    #[error("This customer is already associated to this client")]
    DuplicateAssociation,

    /// A unique value (email, product name) is already taken.
    #[error("{0} already exists")]
    UniquenessConflict(String),

    /// The payload failed validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(Violations),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<&'a [Violation]>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateAssociation | Self::UniquenessConflict(_) => StatusCode::CONFLICT,
            Self::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::DuplicateAssociation => "duplicate_association",
            Self::UniquenessConflict(_) => "uniqueness_conflict",
            Self::ValidationFailed(_) => "validation_failed",
            Self::BadRequest(_) => "bad_request",
            Self::Database(_) | Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::ValidationFailed(_) => "Validation failed".to_owned(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
            violations: match &self {
                Self::ValidationFailed(v) => Some(v.as_slice()),
                _ => None,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_owned()),
            RepositoryError::Conflict(what) => Self::UniquenessConflict(
                what.trim_end_matches(" already exists").to_owned(),
            ),
            other => Self::Database(other),
        }
    }
}

impl From<CustomerError> for AppError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::DuplicateAssociation => Self::DuplicateAssociation,
            CustomerError::UniquenessConflict => {
                Self::UniquenessConflict("customer email".to_owned())
            }
            CustomerError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_owned()),
            AuthError::ClientAlreadyExists => Self::UniquenessConflict("client email".to_owned()),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
        }
    }
}

impl From<Violations> for AppError {
    fn from(violations: Violations) -> Self {
        Self::ValidationFailed(violations)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::NotFound(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated client.
pub fn set_sentry_user(client_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(client_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
