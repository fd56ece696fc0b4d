//! Repository Traits

use chrono::{DateTime, Utc};
use kernel::id::{ConversationId, UserId};

use crate::domain::conversation::Conversation;
use crate::error::TutorResult;

#[trait_variant::make(ConversationRepository: Send)]
pub trait LocalConversationRepository {
    async fn create(&self, conversation: &Conversation) -> TutorResult<()>;

    async fn find_by_id(&self, id: &ConversationId) -> TutorResult<Option<Conversation>>;

    /// Store end data, but only if the stored row is still open.
    /// Returns `false` when someone else ended it first.
    async fn close(&self, conversation: &Conversation) -> TutorResult<bool>;

    /// Conversations the user started at or after `since`
    async fn count_started_since(&self, user_id: &UserId, since: DateTime<Utc>)
    -> TutorResult<i64>;

    /// Ended conversations, newest first
    async fn list_completed(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> TutorResult<Vec<Conversation>>;

    async fn count_completed(&self, user_id: &UserId) -> TutorResult<i64>;
}
