//! Tutor Error Types

use auth::AuthError;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use serde_json::json;
use thiserror::Error;

use crate::domain::realtime::RealtimeError;
use crate::domain::voice::voice_ids;

pub type TutorResult<T> = Result<T, TutorError>;

#[derive(Debug, Error)]
pub enum TutorError {
    /// Authentication or account failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid voice: {0}")]
    InvalidVoice(String),

    /// The stored voice is no longer in the catalog
    #[error("Invalid voice configuration")]
    InvalidVoiceConfiguration,

    #[error("Daily conversation limit reached ({limit} per day)")]
    DailyLimitReached {
        limit: i64,
        used: i64,
        reset_at: DateTime<Utc>,
    },

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Not authorized to end this conversation")]
    NotConversationOwner,

    #[error("Conversation already ended")]
    ConversationAlreadyEnded,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to create conversation session")]
    SessionProvider(#[from] RealtimeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TutorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TutorError::Auth(e) => e.kind(),
            TutorError::InvalidVoice(_)
            | TutorError::InvalidVoiceConfiguration
            | TutorError::ConversationAlreadyEnded
            | TutorError::Validation(_) => ErrorKind::BadRequest,
            TutorError::DailyLimitReached { .. } => ErrorKind::TooManyRequests,
            TutorError::ConversationNotFound => ErrorKind::NotFound,
            TutorError::NotConversationOwner => ErrorKind::Forbidden,
            TutorError::SessionProvider(_) | TutorError::Database(_) | TutorError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            TutorError::Auth(e) => e.to_app_error(),
            TutorError::InvalidVoice(id) => AppError::bad_request(format!(
                "Invalid voice: {id}. Must be one of: {}",
                voice_ids().join(", ")
            )),
            TutorError::DailyLimitReached {
                limit,
                used,
                reset_at,
            } => AppError::too_many_requests(self.to_string()).with_details(json!({
                "limitType": "daily",
                "limit": limit,
                "used": used,
                "resetTime": reset_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            })),
            TutorError::SessionProvider(_) => AppError::internal(self.to_string()),
            TutorError::Database(_) | TutorError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            TutorError::Auth(_) => {}
            TutorError::SessionProvider(e) => {
                tracing::error!(error = %e, "Realtime session provider failed");
            }
            TutorError::Database(e) => {
                tracing::error!(error = %e, "Tutor database error");
            }
            TutorError::Internal(msg) => {
                tracing::error!(message = %msg, "Tutor internal error");
            }
            TutorError::DailyLimitReached { used, .. } => {
                tracing::warn!(used, "Daily conversation limit reached");
            }
            TutorError::NotConversationOwner => {
                tracing::warn!("Attempt to end another user's conversation");
            }
            _ => {
                tracing::debug!(error = %self, "Tutor error");
            }
        }
    }
}

impl IntoResponse for TutorError {
    fn into_response(self) -> Response {
        match self {
            // AuthError logs itself
            TutorError::Auth(e) => e.into_response(),
            other => {
                other.log();
                other.to_app_error().into_response()
            }
        }
    }
}

impl From<tokio::task::JoinError> for TutorError {
    fn from(err: tokio::task::JoinError) -> Self {
        TutorError::Internal(format!("Blocking task failed: {err}"))
    }
}
