//! Tutor Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};

use auth::domain::repository::UserRepository;
use platform::rate_limit::middleware::{RateLimitState, enforce_rate_limit};
use platform::rate_limit::{OperationClass, RateLimitStore, RateLimiter};

use crate::domain::realtime::RealtimeSessionProvider;
use crate::domain::repository::ConversationRepository;
use crate::presentation::handlers::{self, TutorAppState};

fn limited<S, L>(router: Router<S>, limiter: &RateLimiter<L>, class: OperationClass) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    router.route_layer(from_fn_with_state(
        RateLimitState::new(limiter.clone(), class),
        enforce_rate_limit::<L>,
    ))
}

/// Tutor routes, to be nested under `/api`.
///
/// Starting a conversation and awarding points each have their own
/// budget; everything else uses `default`.
pub fn tutor_router<U, C, P, L>(state: TutorAppState<U, C, P>, limiter: RateLimiter<L>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
    P: RealtimeSessionProvider + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let browse = Router::new()
        .route(
            "/profile",
            get(handlers::get_profile::<U, C, P>).patch(handlers::update_profile::<U, C, P>),
        )
        .route("/voices", get(handlers::voices::<U, C, P>))
        .route("/conversations", get(handlers::list_conversations::<U, C, P>));

    let start = Router::new().route(
        "/conversation",
        post(handlers::start_conversation::<U, C, P>),
    );

    let end = Router::new().route(
        "/conversation/{id}/end",
        patch(handlers::end_conversation::<U, C, P>),
    );

    limited(browse, &limiter, OperationClass::Default)
        .merge(limited(start, &limiter, OperationClass::SessionCreation))
        .merge(limited(end, &limiter, OperationClass::PointAward))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::TutorConfig;
    use crate::domain::realtime::RealtimeError;
    use crate::infra::memory::{InMemoryConversationRepository, StubSessionProvider};
    use auth::Authenticator;
    use auth::domain::value_object::{age::Age, display_name::DisplayName, email::Email};
    use auth::infra::memory::InMemoryUserRepository;
    use auth::models::User;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use platform::password::HashedPassword;
    use platform::rate_limit::{NeverSweep, RateLimitTable};
    use platform::token::{SessionSecret, TokenService};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    const HASH: &str = "$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQ$ZmFrZWhhc2hmYWtlaGFzaA";

    struct TestApp {
        router: Router,
        users: Arc<InMemoryUserRepository>,
        token: String,
        user: User,
    }

    async fn app_with(provider: StubSessionProvider, config: TutorConfig) -> TestApp {
        let tokens = Arc::new(TokenService::new(SessionSecret::random()));
        let users = Arc::new(InMemoryUserRepository::new());
        let user = User::new(
            Email::new("katie@example.com").unwrap(),
            HashedPassword::from_phc_string(HASH).unwrap(),
            DisplayName::new("Katie").unwrap(),
            Age::new(11).unwrap(),
        );
        users.create(&user).await.unwrap();
        let token = tokens.issue(&user.identity()).unwrap();

        let state = TutorAppState::new(
            Authenticator::new(tokens, users.clone()),
            users.clone(),
            Arc::new(InMemoryConversationRepository::new()),
            Arc::new(provider),
            config,
        );
        let limiter = RateLimiter::in_memory(RateLimitTable::default())
            .with_sweep_policy(Arc::new(NeverSweep));

        TestApp {
            router: tutor_router(state, limiter),
            users,
            token,
            user,
        }
    }

    async fn app() -> TestApp {
        app_with(StubSessionProvider::succeeding("ek_test"), TutorConfig::default()).await
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.4");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_profile_read_and_update() {
        let t = app().await;

        let response = t
            .router
            .clone()
            .oneshot(request("GET", "/profile", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["user"]["email"], "katie@example.com");

        let response = t
            .router
            .clone()
            .oneshot(request(
                "PATCH",
                "/profile",
                Some(&t.token),
                Some(json!({"selectedVoice": "sage"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Profile updated successfully!");
        assert_eq!(body["user"]["selectedVoice"], "sage");

        let response = t
            .router
            .oneshot(request(
                "PATCH",
                "/profile",
                Some(&t.token),
                Some(json!({"selectedVoice": "nova"})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("shimmer, ballad, alloy, echo, verse, sage"));
    }

    #[tokio::test]
    async fn test_profile_requires_token() {
        let t = app().await;
        let response = t
            .router
            .oneshot(request("GET", "/profile", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "No token provided");
    }

    #[tokio::test]
    async fn test_deleted_account_is_404() {
        let t = app().await;
        t.users.remove(&t.user.id).await;

        let response = t
            .router
            .oneshot(request("GET", "/profile", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "User not found");
    }

    #[tokio::test]
    async fn test_voices_recommendations() {
        let t = app().await;

        let response = t
            .router
            .clone()
            .oneshot(request("GET", "/voices", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let voices = body["voices"].as_array().unwrap();
        assert_eq!(voices.len(), 6);
        assert!(voices.iter().all(|v| v["recommended"] == false));

        // A bad token degrades to the anonymous listing
        let response = t
            .router
            .clone()
            .oneshot(request("GET", "/voices", Some("garbage"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = t
            .router
            .oneshot(request("GET", "/voices", Some(&t.token), None))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert!(body["voices"].as_array().unwrap().iter().all(|v| v["recommended"] == true));
    }

    #[tokio::test]
    async fn test_conversation_lifecycle() {
        let t = app().await;

        let response = t
            .router
            .clone()
            .oneshot(request("POST", "/conversation", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["sessionToken"], "ek_test");
        assert_eq!(body["voice"], "shimmer");
        assert_eq!(body["userName"], "Katie");
        assert_eq!(body["userAge"], 11);
        let id = body["conversationId"].as_str().unwrap().to_string();

        let end_uri = format!("/conversation/{id}/end");
        let response = t
            .router
            .clone()
            .oneshot(request(
                "PATCH",
                &end_uri,
                Some(&t.token),
                Some(json!({"durationMinutes": 12, "topic": "fractions", "pointsEarned": 30})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Conversation ended successfully");
        assert_eq!(body["conversation"]["pointsEarned"], 30);

        let response = t
            .router
            .clone()
            .oneshot(request("PATCH", &end_uri, Some(&t.token), Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Conversation already ended");

        let response = t
            .router
            .oneshot(request("GET", "/conversations", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["conversations"][0]["topic"], "fractions");
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["pagination"]["limit"], 20);
        assert_eq!(body["pagination"]["hasMore"], false);

        let stored = t.users.find_by_id(&t.user.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, 30);
    }

    #[tokio::test]
    async fn test_end_unknown_conversation_is_404() {
        let t = app().await;
        let response = t
            .router
            .oneshot(request(
                "PATCH",
                "/conversation/not-a-uuid/end",
                Some(&t.token),
                Some(json!({})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Conversation not found");
    }

    #[tokio::test]
    async fn test_daily_limit_is_429() {
        let t = app_with(
            StubSessionProvider::succeeding("ek"),
            TutorConfig {
                daily_conversation_limit: 1,
            },
        )
        .await;

        let first = t
            .router
            .clone()
            .oneshot(request("POST", "/conversation", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = t
            .router
            .oneshot(request("POST", "/conversation", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(second).await;
        assert_eq!(body["limitType"], "daily");
        assert_eq!(body["limit"], 1);
        assert_eq!(body["used"], 1);
        assert!(body["resetTime"].as_str().unwrap().ends_with("T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_500() {
        let t = app_with(
            StubSessionProvider::failing(RealtimeError::Transport("connection reset".into())),
            TutorConfig::default(),
        )
        .await;

        let response = t
            .router
            .oneshot(request("POST", "/conversation", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "Failed to create conversation session"
        );
    }

    #[tokio::test]
    async fn test_session_creation_rate_limit() {
        let t = app().await;

        for _ in 0..10 {
            let response = t
                .router
                .clone()
                .oneshot(request("POST", "/conversation", Some(&t.token), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = t
            .router
            .oneshot(request("POST", "/conversation", Some(&t.token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
    }
}
