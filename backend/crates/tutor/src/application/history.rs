//! Conversation History Use Case

use std::sync::Arc;

use kernel::id::UserId;

use crate::domain::conversation::Conversation;
use crate::domain::repository::ConversationRepository;
use crate::error::TutorResult;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

pub struct ListConversationsUseCase<C> {
    conversations: Arc<C>,
}

impl<C> ListConversationsUseCase<C>
where
    C: ConversationRepository,
{
    pub fn new(conversations: Arc<C>) -> Self {
        Self { conversations }
    }

    /// Completed conversations, newest first.
    pub async fn execute(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> TutorResult<ConversationPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);

        let conversations = self
            .conversations
            .list_completed(user_id, limit, offset)
            .await?;
        let total = self.conversations.count_completed(user_id).await?;

        Ok(ConversationPage {
            conversations,
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationSummary;
    use crate::infra::memory::InMemoryConversationRepository;
    use chrono::{Duration, Utc};

    async fn seed(repo: &InMemoryConversationRepository, user_id: UserId, completed: i64) {
        let base = Utc::now();
        for i in 0..completed {
            let mut conversation = Conversation::start(user_id, base - Duration::minutes(i));
            repo.create(&conversation).await.unwrap();
            conversation.end(ConversationSummary::default(), base);
            repo.close(&conversation).await.unwrap();
        }
        // Still in progress; never listed
        repo.create(&Conversation::start(user_id, base + Duration::minutes(1)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pagination() {
        let repo = Arc::new(InMemoryConversationRepository::new());
        let user_id = UserId::new();
        seed(&repo, user_id, 5).await;

        let use_case = ListConversationsUseCase::new(repo);
        let page = use_case.execute(&user_id, Some(2), Some(0)).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.conversations.len(), 2);
        assert!(page.has_more);
        assert!(page.conversations[0].started_at > page.conversations[1].started_at);

        let last = use_case.execute(&user_id, Some(2), Some(4)).await.unwrap();
        assert_eq!(last.conversations.len(), 1);
        assert!(!last.has_more);
    }

    #[tokio::test]
    async fn test_limit_defaults_and_cap() {
        let repo = Arc::new(InMemoryConversationRepository::new());
        let user_id = UserId::new();
        seed(&repo, user_id, 1).await;

        let use_case = ListConversationsUseCase::new(repo);
        let page = use_case.execute(&user_id, None, None).await.unwrap();
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset, 0);

        let page = use_case.execute(&user_id, Some(5_000), Some(-3)).await.unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset, 0);
    }

    #[tokio::test]
    async fn test_other_users_are_invisible() {
        let repo = Arc::new(InMemoryConversationRepository::new());
        seed(&repo, UserId::new(), 3).await;

        let page = ListConversationsUseCase::new(repo)
            .execute(&UserId::new(), None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.conversations.is_empty());
    }
}
