//! Auth Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use platform::rate_limit::middleware::{RateLimitState, enforce_rate_limit};
use platform::rate_limit::{OperationClass, RateLimitStore, RateLimiter};

use crate::domain::repository::UserRepository;
use crate::presentation::handlers::{self, AuthAppState};

/// Auth routes, to be nested under `/api/auth`.
///
/// `register` and `login` share the strict `authentication` budget;
/// `me` uses the `default` budget.
pub fn auth_router<R, L>(state: AuthAppState<R>, limiter: RateLimiter<L>) -> Router
where
    R: UserRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let credentials = Router::new()
        .route("/register", post(handlers::register::<R>))
        .route("/login", post(handlers::login::<R>))
        .route_layer(from_fn_with_state(
            RateLimitState::new(limiter.clone(), OperationClass::Authentication),
            enforce_rate_limit::<L>,
        ));

    let session = Router::new()
        .route("/me", get(handlers::me::<R>))
        .route_layer(from_fn_with_state(
            RateLimitState::new(limiter, OperationClass::Default),
            enforce_rate_limit::<L>,
        ));

    credentials.merge(session).with_state(state)
}
