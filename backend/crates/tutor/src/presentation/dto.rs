//! API DTOs (Data Transfer Objects)

use auth::models::UserResponse;
use chrono::{DateTime, Utc};
use kernel::id::ConversationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{ConversationPage, StartConversationOutput, VoiceListing};
use crate::domain::conversation::Conversation;

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub selected_voice: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdatedResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

// ============================================================================
// Voices
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceListing>,
}

// ============================================================================
// Conversations
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationResponse {
    pub conversation_id: ConversationId,
    /// Ephemeral realtime credential for the browser
    pub session_token: String,
    pub voice: String,
    pub user_name: String,
    pub user_age: u8,
}

impl From<StartConversationOutput> for StartConversationResponse {
    fn from(output: StartConversationOutput) -> Self {
        Self {
            conversation_id: output.conversation_id,
            session_token: output.session_token,
            voice: output.voice,
            user_name: output.user_name,
            user_age: output.user_age,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConversationRequest {
    pub duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub points_earned: Option<i32>,
    pub transcript: Option<Value>,
    pub had_errors: Option<bool>,
    pub error_log: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndedConversation {
    pub id: ConversationId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub points_earned: i32,
}

impl From<&Conversation> for EndedConversation {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id,
            started_at: c.started_at,
            ended_at: c.ended_at,
            duration_minutes: c.duration_minutes,
            topic: c.topic.clone(),
            points_earned: c.points_earned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EndConversationResponse {
    pub message: &'static str,
    pub conversation: EndedConversation,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListItem {
    pub id: ConversationId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub points_earned: i32,
    pub had_errors: bool,
}

impl From<&Conversation> for ConversationListItem {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id,
            started_at: c.started_at,
            ended_at: c.ended_at,
            duration_minutes: c.duration_minutes,
            topic: c.topic.clone(),
            points_earned: c.points_earned,
            had_errors: c.had_errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationListItem>,
    pub pagination: Pagination,
}

impl From<ConversationPage> for ConversationListResponse {
    fn from(page: ConversationPage) -> Self {
        Self {
            conversations: page.conversations.iter().map(ConversationListItem::from).collect(),
            pagination: Pagination {
                total: page.total,
                limit: page.limit,
                offset: page.offset,
                has_more: page.has_more,
            },
        }
    }
}
