//! In-memory fakes
//!
//! Back use-case and handler tests; not used by the server.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use kernel::id::{ConversationId, UserId};
use tokio::sync::RwLock;

use crate::domain::conversation::Conversation;
use crate::domain::realtime::{
    RealtimeError, RealtimeSession, RealtimeSessionProvider, RealtimeSessionRequest,
};
use crate::domain::repository::ConversationRepository;
use crate::error::TutorResult;

#[derive(Debug, Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }
}

impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, conversation: &Conversation) -> TutorResult<()> {
        self.conversations
            .write()
            .await
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ConversationId) -> TutorResult<Option<Conversation>> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn close(&self, conversation: &Conversation) -> TutorResult<bool> {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(&conversation.id) {
            Some(stored) if !stored.is_ended() => {
                *stored = conversation.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_started_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> TutorResult<i64> {
        let count = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| &c.user_id == user_id && c.started_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn list_completed(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> TutorResult<Vec<Conversation>> {
        let mut completed: Vec<_> = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| &c.user_id == user_id && c.is_ended())
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        Ok(completed
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_completed(&self, user_id: &UserId) -> TutorResult<i64> {
        let count = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| &c.user_id == user_id && c.is_ended())
            .count();
        Ok(count as i64)
    }
}

/// Session provider that answers from a script instead of the network.
#[derive(Debug)]
pub struct StubSessionProvider {
    outcome: Result<String, RealtimeError>,
    requests: Mutex<Vec<RealtimeSessionRequest>>,
    calls: AtomicUsize,
}

impl StubSessionProvider {
    pub fn succeeding(client_secret: impl Into<String>) -> Self {
        Self::with_outcome(Ok(client_secret.into()))
    }

    pub fn failing(error: RealtimeError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<String, RealtimeError>) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RealtimeSessionRequest> {
        self.requests
            .lock()
            .ok()
            .and_then(|requests| requests.last().cloned())
    }
}

impl RealtimeSessionProvider for StubSessionProvider {
    async fn create_session(
        &self,
        request: &RealtimeSessionRequest,
    ) -> Result<RealtimeSession, RealtimeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.outcome.clone().map(|client_secret| RealtimeSession { client_secret })
    }
}
