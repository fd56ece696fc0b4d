//! Axum middleware that applies the rate limiter to a route.
//!
//! ```ignore
//! let auth = RateLimitState::new(limiter.clone(), OperationClass::Authentication);
//! Router::new()
//!     .route("/login", post(login))
//!     .route_layer(from_fn_with_state(auth, enforce_rate_limit::<MemoryRateLimitStore>));
//! ```

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;

use super::{MemoryRateLimitStore, OperationClass, RateLimitResult, RateLimitStore, RateLimiter};
use crate::client::client_key;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

/// Limiter plus the operation class of the routes it guards.
pub struct RateLimitState<S = MemoryRateLimitStore> {
    pub limiter: RateLimiter<S>,
    pub class: OperationClass,
}

impl<S> RateLimitState<S> {
    pub fn new(limiter: RateLimiter<S>, class: OperationClass) -> Self {
        Self { limiter, class }
    }
}

impl<S> Clone for RateLimitState<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            class: self.class,
        }
    }
}

/// Admit or reject the request before it reaches the handler.
///
/// Rejections get `429` with `Retry-After`; every response carries the
/// `X-RateLimit-*` headers. A store failure rejects with `500`.
pub async fn enforce_rate_limit<S>(
    State(state): State<RateLimitState<S>>,
    request: Request,
    next: Next,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
{
    let direct_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_key(request.headers(), direct_ip);

    let result = match state.limiter.admit(&client, state.class).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, class = %state.class, "Rate-limit check failed");
            return AppError::internal("Internal server error").into_response();
        }
    };

    let mut response = match result.retry_after_secs {
        None => next.run(request).await,
        Some(retry_after) => AppError::too_many_requests(RATE_LIMITED_MESSAGE)
            .with_retry_after(retry_after)
            .into_response(),
    };
    apply_headers(response.headers_mut(), &result);
    response
}

fn apply_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(result.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(result.reset_at_secs()));
}
