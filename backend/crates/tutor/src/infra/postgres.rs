//! PostgreSQL Repository Implementation

use chrono::{DateTime, Utc};
use kernel::id::{ConversationId, UserId};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::conversation::Conversation;
use crate::domain::repository::ConversationRepository;
use crate::error::TutorResult;

const CONVERSATION_COLUMNS: &str = r#"
    id,
    user_id,
    started_at,
    ended_at,
    duration_minutes,
    topic,
    points_earned,
    transcript,
    had_errors,
    error_log,
    connection_attempts
"#;

/// PostgreSQL-backed conversation repository
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConversationRepository for PgConversationRepository {
    async fn create(&self, conversation: &Conversation) -> TutorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (
                id,
                user_id,
                started_at,
                ended_at,
                duration_minutes,
                topic,
                points_earned,
                transcript,
                had_errors,
                error_log,
                connection_attempts
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(conversation.id.as_uuid())
        .bind(conversation.user_id.as_uuid())
        .bind(conversation.started_at)
        .bind(conversation.ended_at)
        .bind(conversation.duration_minutes)
        .bind(&conversation.topic)
        .bind(conversation.points_earned)
        .bind(&conversation.transcript)
        .bind(conversation.had_errors)
        .bind(&conversation.error_log)
        .bind(conversation.connection_attempts)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ConversationId) -> TutorResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ConversationRow::into_conversation))
    }

    async fn close(&self, conversation: &Conversation) -> TutorResult<bool> {
        // The ended_at guard makes concurrent end requests race safely.
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                ended_at = $2,
                duration_minutes = $3,
                topic = $4,
                points_earned = $5,
                transcript = $6,
                had_errors = $7,
                error_log = $8
            WHERE id = $1 AND ended_at IS NULL
            "#,
        )
        .bind(conversation.id.as_uuid())
        .bind(conversation.ended_at)
        .bind(conversation.duration_minutes)
        .bind(&conversation.topic)
        .bind(conversation.points_earned)
        .bind(&conversation.transcript)
        .bind(conversation.had_errors)
        .bind(&conversation.error_log)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_started_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> TutorResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversations WHERE user_id = $1 AND started_at >= $2",
        )
        .bind(user_id.as_uuid())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_completed(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> TutorResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS}
            FROM conversations
            WHERE user_id = $1 AND ended_at IS NOT NULL
            ORDER BY started_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(ConversationRow::into_conversation)
            .collect())
    }

    async fn count_completed(&self, user_id: &UserId) -> TutorResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversations WHERE user_id = $1 AND ended_at IS NOT NULL",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    user_id: Uuid,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    duration_minutes: Option<i32>,
    topic: Option<String>,
    points_earned: i32,
    transcript: Option<Value>,
    had_errors: bool,
    error_log: Option<Value>,
    connection_attempts: i32,
}

impl ConversationRow {
    fn into_conversation(self) -> Conversation {
        Conversation {
            id: ConversationId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_minutes: self.duration_minutes,
            topic: self.topic,
            points_earned: self.points_earned,
            transcript: self.transcript,
            had_errors: self.had_errors,
            error_log: self.error_log,
            connection_attempts: self.connection_attempts,
        }
    }
}
