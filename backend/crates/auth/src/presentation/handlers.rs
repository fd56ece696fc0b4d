//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, header};
use std::sync::Arc;

use platform::password::PasswordCodec;
use platform::token::TokenService;

use crate::application::{
    Authenticator, CurrentUserUseCase, LoginInput, LoginUseCase, RegisterInput, RegisterUseCase,
};
use crate::domain::repository::UserRepository;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthResponse, LoginRequest, RegisterRequest, UserEnvelope, UserResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<R> {
    pub users: Arc<R>,
    pub passwords: Arc<PasswordCodec>,
    pub tokens: Arc<TokenService>,
    pub authenticator: Authenticator<R>,
}

impl<R> Clone for AuthAppState<R> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            passwords: Arc::clone(&self.passwords),
            tokens: Arc::clone(&self.tokens),
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<R> AuthAppState<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    pub fn new(users: Arc<R>, passwords: Arc<PasswordCodec>, tokens: Arc<TokenService>) -> Self {
        let authenticator = Authenticator::new(Arc::clone(&tokens), Arc::clone(&users));
        Self {
            users,
            passwords,
            tokens,
            authenticator,
        }
    }
}

/// Raw `Authorization` header value, if present and valid UTF-8
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Map a JSON body rejection to a validation error
pub fn invalid_input(rejection: JsonRejection) -> AuthError {
    tracing::debug!(error = %rejection.body_text(), "Rejected request body");
    AuthError::Validation("Invalid input".to_string())
}

// ============================================================================
// Register
// ============================================================================

/// POST /api/auth/register
pub async fn register<R>(
    State(state): State<AuthAppState<R>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<Json<AuthResponse>>
where
    R: UserRepository + Send + Sync + 'static,
{
    let Json(req) = payload.map_err(invalid_input)?;

    let use_case = RegisterUseCase::new(
        state.users.clone(),
        state.passwords.clone(),
        state.tokens.clone(),
    );

    let output = use_case
        .execute(RegisterInput {
            email: req.email,
            password: req.password,
            name: req.name,
            age: req.age,
        })
        .await?;

    Ok(Json(AuthResponse {
        message: "Account created successfully!",
        token: output.token,
        user: UserResponse::from(&output.user),
    }))
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<AuthResponse>>
where
    R: UserRepository + Send + Sync + 'static,
{
    let Json(req) = payload.map_err(invalid_input)?;

    let use_case = LoginUseCase::new(
        state.users.clone(),
        state.passwords.clone(),
        state.tokens.clone(),
    );

    let output = use_case
        .execute(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(AuthResponse {
        message: "Login successful!",
        token: output.token,
        user: UserResponse::from(&output.user),
    }))
}

// ============================================================================
// Current User
// ============================================================================

/// GET /api/auth/me
pub async fn me<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> AuthResult<Json<UserEnvelope>>
where
    R: UserRepository + Send + Sync + 'static,
{
    let user = CurrentUserUseCase::new(&state.authenticator)
        .execute(authorization_header(&headers))
        .await?;

    Ok(Json(UserEnvelope {
        user: UserResponse::from(&user),
    }))
}
