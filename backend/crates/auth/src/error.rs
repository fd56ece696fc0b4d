//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer credential on the request
    #[error("No token provided")]
    MissingCredential,

    /// Token failed verification (tampered, expired, malformed)
    #[error("Invalid or expired token")]
    InvalidOrExpiredCredential,

    /// Token was valid but its user no longer exists
    #[error("User not found")]
    PrincipalNotFound,

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailTaken,

    /// Request input failed validation
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidOrExpiredCredential
            | AuthError::InvalidCredentials => ErrorKind::Unauthorized,
            AuthError::PrincipalNotFound => ErrorKind::NotFound,
            // Duplicate email is reported as a plain bad request
            AuthError::EmailTaken | AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError. Server-side faults never expose their cause.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidOrExpiredCredential => {
                tracing::warn!("Rejected invalid or expired token");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("Blocking task failed: {err}"))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        err.log();
        err.to_app_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_client_errors() {
        assert_eq!(AuthError::MissingCredential.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidOrExpiredCredential.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::PrincipalNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::EmailTaken.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let app = AuthError::Internal("argon2 blew up".into()).to_app_error();
        assert_eq!(app.status_code(), 500);
        assert_eq!(app.message(), "Internal server error");

        let app = AuthError::Database(sqlx::Error::PoolTimedOut).to_app_error();
        assert_eq!(app.message(), "Internal server error");
    }

    #[test]
    fn test_messages_match_wire_contract() {
        assert_eq!(AuthError::MissingCredential.to_app_error().message(), "No token provided");
        assert_eq!(
            AuthError::InvalidCredentials.to_app_error().message(),
            "Invalid email or password"
        );
    }
}
