//! Start Conversation Use Case
//!
//! Opens a conversation record and obtains a realtime voice session for
//! the learner's chosen voice. Enforces the per-user daily cap.

use std::sync::Arc;

use auth::models::User;
use chrono::{DateTime, Days, Utc};
use kernel::id::ConversationId;
use platform::clock::Clock;
use serde_json::json;

use crate::domain::conversation::Conversation;
use crate::domain::realtime::{RealtimeSessionProvider, RealtimeSessionRequest, tutor_instructions};
use crate::domain::repository::ConversationRepository;
use crate::domain::voice::voice_by_id;
use crate::error::{TutorError, TutorResult};

#[derive(Debug, Clone)]
pub struct StartConversationOutput {
    pub conversation_id: ConversationId,
    pub session_token: String,
    pub voice: String,
    pub user_name: String,
    pub user_age: u8,
}

pub struct StartConversationUseCase<C, P> {
    conversations: Arc<C>,
    provider: Arc<P>,
    clock: Arc<dyn Clock>,
    daily_limit: i64,
}

impl<C, P> StartConversationUseCase<C, P>
where
    C: ConversationRepository,
    P: RealtimeSessionProvider,
{
    pub fn new(
        conversations: Arc<C>,
        provider: Arc<P>,
        clock: Arc<dyn Clock>,
        daily_limit: i64,
    ) -> Self {
        Self {
            conversations,
            provider,
            clock,
            daily_limit,
        }
    }

    pub async fn execute(&self, user: &User) -> TutorResult<StartConversationOutput> {
        let now = now_utc(self.clock.as_ref())?;
        let day_start = start_of_utc_day(now);

        let used = self
            .conversations
            .count_started_since(&user.id, day_start)
            .await?;
        if used >= self.daily_limit {
            return Err(TutorError::DailyLimitReached {
                limit: self.daily_limit,
                used,
                reset_at: day_start + Days::new(1),
            });
        }

        if voice_by_id(&user.selected_voice).is_none() {
            return Err(TutorError::InvalidVoiceConfiguration);
        }

        let mut conversation = Conversation::start(user.id, now);
        self.conversations.create(&conversation).await?;

        let request = RealtimeSessionRequest {
            voice: user.selected_voice.clone(),
            instructions: tutor_instructions(user.name.as_str(), user.age.years()),
        };

        let session = match self.provider.create_session(&request).await {
            Ok(session) => session,
            Err(e) => {
                conversation.fail(
                    json!({"error": "Failed to create session", "details": e.to_string()}),
                    now_utc(self.clock.as_ref())?,
                );
                if let Err(store_err) = self.conversations.close(&conversation).await {
                    tracing::error!(
                        conversation_id = %conversation.id,
                        error = %store_err,
                        "Failed to record session failure"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            user_id = %user.id,
            conversation_id = %conversation.id,
            voice = %user.selected_voice,
            "Conversation started"
        );

        Ok(StartConversationOutput {
            conversation_id: conversation.id,
            session_token: session.client_secret,
            voice: user.selected_voice.clone(),
            user_name: user.name.to_string(),
            user_age: user.age.years(),
        })
    }
}

pub(crate) fn now_utc(clock: &dyn Clock) -> TutorResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(clock.now_ms())
        .ok_or_else(|| TutorError::Internal("Clock out of range".to_string()))
}

/// Midnight UTC of the day containing `now`
pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}
