//! Application Error - the single error type that reaches HTTP clients.

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};

use super::kind::ErrorKind;

/// Unified application error.
///
/// Crate-level errors convert into this type at the HTTP boundary. The
/// `message` is what the client sees; server-side faults must use a
/// generic message.
///
/// ```rust
/// use kernel::error::app_error::AppError;
///
/// let err = AppError::too_many_requests("Too many requests. Please try again later.")
///     .with_retry_after(30);
/// assert_eq!(err.status_code(), 429);
/// assert_eq!(err.body()["retryAfter"], "30 seconds");
/// ```
#[derive(Debug, Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    /// Seconds until the client may retry (capacity errors only)
    retry_after_secs: Option<u64>,
    /// Extra machine-readable fields merged into the response body
    details: Option<Value>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn too_many_requests(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    /// Attach extra body fields. Objects are merged into the body; any
    /// other value lands under `details`.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after_secs
    }

    /// JSON body sent to clients: `{"error": message, ...}`
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), self.message().into());
        if let Some(secs) = self.retry_after_secs {
            body.insert("retryAfter".into(), format!("{secs} seconds").into());
        }
        match &self.details {
            Some(Value::Object(extra)) => {
                body.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(other) => {
                body.insert("details".into(), other.clone());
            }
            None => {}
        }
        Value::Object(body)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::{HeaderValue, StatusCode, header};

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, Json(self.body())).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
