//! Router assembly

use std::sync::Arc;

use anyhow::Context;
use auth::{AuthAppState, AuthConfig, Authenticator, PgUserRepository, auth_router};
use axum::http::{HeaderValue, Method, header};
use axum::{Router, routing::get};
use platform::password::PasswordCodec;
use platform::rate_limit::RateLimiter;
use platform::token::TokenService;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tutor::{OpenAiRealtimeClient, PgConversationRepository, TutorAppState, TutorConfig, tutor_router};

use crate::config::AppConfig;

/// Everything the routers share
pub struct Services {
    pub users: Arc<PgUserRepository>,
    pub conversations: Arc<PgConversationRepository>,
    pub passwords: Arc<PasswordCodec>,
    pub tokens: Arc<TokenService>,
    pub realtime: Arc<OpenAiRealtimeClient>,
    pub limiter: RateLimiter,
}

impl Services {
    pub fn new(config: &AppConfig, pool: PgPool, limiter: RateLimiter) -> anyhow::Result<Self> {
        let mut auth = AuthConfig::new(config.session_secret.clone());
        auth.password_pepper = config.password_pepper.clone();
        let passwords = auth
            .password_codec()
            .context("Invalid password hashing parameters")?;
        let realtime = OpenAiRealtimeClient::new(config.openai_api_key.clone())
            .context("Failed to build realtime HTTP client")?
            .with_model(config.realtime_model.clone());

        Ok(Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            conversations: Arc::new(PgConversationRepository::new(pool)),
            passwords: Arc::new(passwords),
            tokens: Arc::new(auth.token_service()),
            realtime: Arc::new(realtime),
            limiter,
        })
    }
}

async fn health() -> &'static str {
    "ok"
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}

pub fn router(config: &AppConfig, services: Services) -> Router {
    let auth_state = AuthAppState::new(
        services.users.clone(),
        services.passwords,
        services.tokens.clone(),
    );
    let tutor_state = TutorAppState::new(
        Authenticator::new(services.tokens, services.users.clone()),
        services.users,
        services.conversations,
        services.realtime,
        TutorConfig::default(),
    );

    let api = Router::new()
        .nest("/auth", auth_router(auth_state, services.limiter.clone()))
        .merge(tutor_router(tutor_state, services.limiter));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors(&config.frontend_origins)),
        )
}
