//! HTTP Handlers

use std::sync::Arc;

use auth::Authenticator;
use auth::domain::repository::UserRepository;
use auth::models::{UserEnvelope, UserResponse};
use auth::presentation::handlers::{authorization_header, invalid_input};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use kernel::id::ConversationId;
use platform::clock::{Clock, SystemClock};

use crate::application::{
    EndConversationInput, EndConversationUseCase, ListConversationsUseCase, StartConversationUseCase,
    TutorConfig, UpdateProfileInput, UpdateProfileUseCase, list_voices,
};
use crate::domain::realtime::RealtimeSessionProvider;
use crate::domain::repository::ConversationRepository;
use crate::error::{TutorError, TutorResult};
use crate::presentation::dto::{
    ConversationListResponse, EndConversationRequest, EndConversationResponse, EndedConversation,
    HistoryQuery, ProfileUpdatedResponse, StartConversationResponse, UpdateProfileRequest,
    VoicesResponse,
};

/// Shared state for tutor handlers
pub struct TutorAppState<U, C, P> {
    pub authenticator: Authenticator<U>,
    pub users: Arc<U>,
    pub conversations: Arc<C>,
    pub provider: Arc<P>,
    pub clock: Arc<dyn Clock>,
    pub config: TutorConfig,
}

impl<U, C, P> Clone for TutorAppState<U, C, P> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            users: Arc::clone(&self.users),
            conversations: Arc::clone(&self.conversations),
            provider: Arc::clone(&self.provider),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<U, C, P> TutorAppState<U, C, P> {
    pub fn new(
        authenticator: Authenticator<U>,
        users: Arc<U>,
        conversations: Arc<C>,
        provider: Arc<P>,
        config: TutorConfig,
    ) -> Self {
        Self {
            authenticator,
            users,
            conversations,
            provider,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

fn invalid_query(rejection: QueryRejection) -> TutorError {
    tracing::debug!(error = %rejection.body_text(), "Rejected query string");
    TutorError::Validation("Invalid input".to_string())
}

// ============================================================================
// Profile
// ============================================================================

/// GET /api/profile
pub async fn get_profile<U, C, P>(
    State(state): State<TutorAppState<U, C, P>>,
    headers: HeaderMap,
) -> TutorResult<Json<UserEnvelope>>
where
    U: UserRepository + Send + Sync + 'static,
{
    let user = state
        .authenticator
        .authenticate_principal(authorization_header(&headers))
        .await?;

    Ok(Json(UserEnvelope {
        user: UserResponse::from(&user),
    }))
}

/// PATCH /api/profile
pub async fn update_profile<U, C, P>(
    State(state): State<TutorAppState<U, C, P>>,
    headers: HeaderMap,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> TutorResult<Json<ProfileUpdatedResponse>>
where
    U: UserRepository + Send + Sync + 'static,
{
    let user = state
        .authenticator
        .authenticate_principal(authorization_header(&headers))
        .await?;
    let Json(req) = payload.map_err(invalid_input)?;

    let user = UpdateProfileUseCase::new(state.users.clone())
        .execute(
            user,
            UpdateProfileInput {
                name: req.name,
                selected_voice: req.selected_voice,
            },
        )
        .await?;

    Ok(Json(ProfileUpdatedResponse {
        message: "Profile updated successfully!",
        user: UserResponse::from(&user),
    }))
}

// ============================================================================
// Voices
// ============================================================================

/// GET /api/voices
///
/// Public. A valid token adds age-based recommendations.
pub async fn voices<U, C, P>(
    State(state): State<TutorAppState<U, C, P>>,
    headers: HeaderMap,
) -> Json<VoicesResponse>
where
    U: UserRepository + Send + Sync + 'static,
{
    let learner_age = state
        .authenticator
        .authenticate_optional(authorization_header(&headers))
        .await
        .map(|user| user.age.years());

    Json(VoicesResponse {
        voices: list_voices(learner_age),
    })
}

// ============================================================================
// Conversations
// ============================================================================

/// POST /api/conversation
pub async fn start_conversation<U, C, P>(
    State(state): State<TutorAppState<U, C, P>>,
    headers: HeaderMap,
) -> TutorResult<Json<StartConversationResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
    P: RealtimeSessionProvider + Send + Sync + 'static,
{
    let user = state
        .authenticator
        .authenticate_principal(authorization_header(&headers))
        .await?;

    let output = StartConversationUseCase::new(
        state.conversations.clone(),
        state.provider.clone(),
        state.clock.clone(),
        state.config.daily_conversation_limit,
    )
    .execute(&user)
    .await?;

    Ok(Json(output.into()))
}

/// PATCH /api/conversation/{id}/end
pub async fn end_conversation<U, C, P>(
    State(state): State<TutorAppState<U, C, P>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<EndConversationRequest>, JsonRejection>,
) -> TutorResult<Json<EndConversationResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
{
    let user_id = state
        .authenticator
        .authenticate_user_id(authorization_header(&headers))?;
    let Json(req) = payload.map_err(invalid_input)?;

    // Not a UUID: no such conversation
    let conversation_id: ConversationId =
        id.parse().map_err(|_| TutorError::ConversationNotFound)?;

    let conversation = EndConversationUseCase::new(
        state.conversations.clone(),
        state.users.clone(),
        state.clock.clone(),
    )
    .execute(
        &user_id,
        &conversation_id,
        EndConversationInput {
            duration_minutes: req.duration_minutes,
            topic: req.topic,
            points_earned: req.points_earned,
            transcript: req.transcript,
            had_errors: req.had_errors,
            error_log: req.error_log,
        },
    )
    .await?;

    Ok(Json(EndConversationResponse {
        message: "Conversation ended successfully",
        conversation: EndedConversation::from(&conversation),
    }))
}

/// GET /api/conversations?limit=&offset=
pub async fn list_conversations<U, C, P>(
    State(state): State<TutorAppState<U, C, P>>,
    headers: HeaderMap,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> TutorResult<Json<ConversationListResponse>>
where
    U: UserRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
{
    let user_id = state
        .authenticator
        .authenticate_user_id(authorization_header(&headers))?;
    let Query(query) = query.map_err(invalid_query)?;

    let page = ListConversationsUseCase::new(state.conversations.clone())
        .execute(&user_id, query.limit, query.offset)
        .await?;

    Ok(Json(page.into()))
}
