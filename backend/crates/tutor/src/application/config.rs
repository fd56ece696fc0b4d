//! Tutor Configuration

/// Conversations a learner may start per UTC day
pub const DEFAULT_DAILY_CONVERSATION_LIMIT: i64 = 20;

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub daily_conversation_limit: i64,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            daily_conversation_limit: DEFAULT_DAILY_CONVERSATION_LIMIT,
        }
    }
}
