//! End Conversation Use Case
//!
//! Closes a conversation with the learner's summary and credits the
//! points earned.

use std::sync::Arc;

use auth::domain::repository::UserRepository;
use kernel::id::{ConversationId, UserId};
use platform::clock::Clock;
use serde_json::Value;

use crate::application::start_conversation::now_utc;
use crate::domain::conversation::{Conversation, ConversationSummary};
use crate::domain::repository::ConversationRepository;
use crate::error::{TutorError, TutorResult};

#[derive(Debug, Clone, Default)]
pub struct EndConversationInput {
    pub duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub points_earned: Option<i32>,
    pub transcript: Option<Value>,
    pub had_errors: Option<bool>,
    pub error_log: Option<Value>,
}

impl EndConversationInput {
    fn into_summary(self) -> TutorResult<ConversationSummary> {
        if self.duration_minutes.is_some_and(|d| d < 0)
            || self.points_earned.is_some_and(|p| p < 0)
        {
            return Err(TutorError::Validation("Invalid input".to_string()));
        }

        Ok(ConversationSummary {
            duration_minutes: self.duration_minutes,
            topic: self.topic,
            points_earned: self.points_earned.unwrap_or(0),
            transcript: self.transcript,
            had_errors: self.had_errors.unwrap_or(false),
            error_log: self.error_log,
        })
    }
}

pub struct EndConversationUseCase<C, U> {
    conversations: Arc<C>,
    users: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<C, U> EndConversationUseCase<C, U>
where
    C: ConversationRepository,
    U: UserRepository,
{
    pub fn new(conversations: Arc<C>, users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            conversations,
            users,
            clock,
        }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
        input: EndConversationInput,
    ) -> TutorResult<Conversation> {
        let summary = input.into_summary()?;

        let mut conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or(TutorError::ConversationNotFound)?;

        if !conversation.is_owned_by(user_id) {
            return Err(TutorError::NotConversationOwner);
        }
        if conversation.is_ended() {
            return Err(TutorError::ConversationAlreadyEnded);
        }

        conversation.end(summary, now_utc(self.clock.as_ref())?);

        // Lost the race against a concurrent end request
        if !self.conversations.close(&conversation).await? {
            return Err(TutorError::ConversationAlreadyEnded);
        }

        if conversation.points_earned > 0 {
            self.users
                .add_points(user_id, i64::from(conversation.points_earned))
                .await?;
        }

        tracing::info!(
            user_id = %user_id,
            conversation_id = %conversation.id,
            points = conversation.points_earned,
            "Conversation ended"
        );

        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryConversationRepository;
    use auth::domain::value_object::{age::Age, display_name::DisplayName, email::Email};
    use auth::infra::memory::InMemoryUserRepository;
    use auth::models::User;
    use chrono::Utc;
    use platform::clock::SystemClock;
    use platform::password::HashedPassword;

    const HASH: &str = "$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQ$ZmFrZWhhc2hmYWtlaGFzaA";

    struct Fixture {
        use_case: EndConversationUseCase<InMemoryConversationRepository, InMemoryUserRepository>,
        users: Arc<InMemoryUserRepository>,
        user: User,
        conversation: Conversation,
    }

    async fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepository::new());
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let user = User::new(
            Email::new("katie@example.com").unwrap(),
            HashedPassword::from_phc_string(HASH).unwrap(),
            DisplayName::new("Katie").unwrap(),
            Age::new(11).unwrap(),
        );
        users.create(&user).await.unwrap();
        let conversation = Conversation::start(user.id, Utc::now());
        conversations.create(&conversation).await.unwrap();

        Fixture {
            use_case: EndConversationUseCase::new(
                conversations,
                users.clone(),
                Arc::new(SystemClock),
            ),
            users,
            user,
            conversation,
        }
    }

    fn summary(points: i32) -> EndConversationInput {
        EndConversationInput {
            duration_minutes: Some(10),
            topic: Some("fractions".into()),
            points_earned: Some(points),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_end_awards_points() {
        let f = fixture().await;

        let ended = f
            .use_case
            .execute(&f.user.id, &f.conversation.id, summary(15))
            .await
            .unwrap();
        assert!(ended.is_ended());
        assert_eq!(ended.topic.as_deref(), Some("fractions"));

        let stored = f.users.find_by_id(&f.user.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, 15);
    }

    #[tokio::test]
    async fn test_end_twice_is_rejected() {
        let f = fixture().await;
        f.use_case
            .execute(&f.user.id, &f.conversation.id, summary(5))
            .await
            .unwrap();

        let err = f
            .use_case
            .execute(&f.user.id, &f.conversation.id, summary(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::ConversationAlreadyEnded));

        // Points credited once
        let stored = f.users.find_by_id(&f.user.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, 5);
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_conversations() {
        let f = fixture().await;

        let err = f
            .use_case
            .execute(&f.user.id, &ConversationId::new(), summary(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::ConversationNotFound));

        let err = f
            .use_case
            .execute(&UserId::new(), &f.conversation.id, summary(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::NotConversationOwner));
    }

    #[tokio::test]
    async fn test_negative_points_rejected() {
        let f = fixture().await;
        let err = f
            .use_case
            .execute(&f.user.id, &f.conversation.id, summary(-3))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_zero_points_leaves_total_untouched() {
        let f = fixture().await;
        f.use_case
            .execute(&f.user.id, &f.conversation.id, EndConversationInput::default())
            .await
            .unwrap();

        let stored = f.users.find_by_id(&f.user.id).await.unwrap().unwrap();
        assert_eq!(stored.total_points, 0);
    }
}
