//! Conversation Entity
//!
//! One voice tutoring session. Opened when the realtime session is
//! requested; closed once, by its owner, with a summary.

use chrono::{DateTime, Utc};
use kernel::id::{ConversationId, UserId};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub points_earned: i32,
    pub transcript: Option<Value>,
    pub had_errors: bool,
    pub error_log: Option<Value>,
    pub connection_attempts: i32,
}

/// Summary submitted when a conversation ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSummary {
    pub duration_minutes: Option<i32>,
    pub topic: Option<String>,
    pub points_earned: i32,
    pub transcript: Option<Value>,
    pub had_errors: bool,
    pub error_log: Option<Value>,
}

impl Conversation {
    pub fn start(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            user_id,
            started_at: now,
            ended_at: None,
            duration_minutes: None,
            topic: None,
            points_earned: 0,
            transcript: None,
            had_errors: false,
            error_log: None,
            connection_attempts: 1,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Close with the learner's summary.
    pub fn end(&mut self, summary: ConversationSummary, now: DateTime<Utc>) {
        self.ended_at = Some(now);
        self.duration_minutes = summary.duration_minutes;
        self.topic = summary.topic;
        self.points_earned = summary.points_earned;
        self.transcript = summary.transcript;
        self.had_errors = summary.had_errors;
        self.error_log = summary.error_log;
    }

    /// Close because the voice session could not be created.
    pub fn fail(&mut self, error_log: Value, now: DateTime<Utc>) {
        self.ended_at = Some(now);
        self.had_errors = true;
        self.error_log = Some(error_log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_is_open() {
        let conversation = Conversation::start(UserId::new(), Utc::now());
        assert!(!conversation.is_ended());
        assert_eq!(conversation.connection_attempts, 1);
        assert_eq!(conversation.points_earned, 0);
    }

    #[test]
    fn test_end_records_summary() {
        let mut conversation = Conversation::start(UserId::new(), Utc::now());
        let summary = ConversationSummary {
            duration_minutes: Some(12),
            topic: Some("fractions".into()),
            points_earned: 15,
            ..Default::default()
        };
        conversation.end(summary, Utc::now());

        assert!(conversation.is_ended());
        assert_eq!(conversation.topic.as_deref(), Some("fractions"));
        assert_eq!(conversation.points_earned, 15);
        assert!(!conversation.had_errors);
    }

    #[test]
    fn test_fail_marks_errors() {
        let mut conversation = Conversation::start(UserId::new(), Utc::now());
        conversation.fail(json!({"error": "Failed to create session"}), Utc::now());
        assert!(conversation.is_ended());
        assert!(conversation.had_errors);
    }

    #[test]
    fn test_ownership() {
        let owner = UserId::new();
        let conversation = Conversation::start(owner, Utc::now());
        assert!(conversation.is_owned_by(&owner));
        assert!(!conversation.is_owned_by(&UserId::new()));
    }
}
