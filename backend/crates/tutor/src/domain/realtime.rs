//! Realtime voice session port
//!
//! The tutor never streams audio itself. It asks the provider for a
//! short-lived client secret that the browser uses to connect directly.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeSessionRequest {
    pub voice: String,
    /// System prompt for the tutor persona
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeSession {
    /// Ephemeral credential handed to the client
    pub client_secret: String,
}

#[derive(Debug, Clone, Error)]
pub enum RealtimeError {
    #[error("Realtime provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Realtime provider request failed: {0}")]
    Transport(String),

    #[error("Malformed realtime provider response: {0}")]
    Malformed(String),
}

#[trait_variant::make(RealtimeSessionProvider: Send)]
pub trait LocalRealtimeSessionProvider {
    async fn create_session(
        &self,
        request: &RealtimeSessionRequest,
    ) -> Result<RealtimeSession, RealtimeError>;
}

/// Socratic tutor persona, addressed to the learner by name and age.
pub fn tutor_instructions(name: &str, age: u8) -> String {
    format!(
        "You are a helpful AI tutor named Helper. You're talking with {name}, who is {age} years old.

Your teaching philosophy is Socratic - guide students to discover answers themselves rather than giving direct answers. Ask thoughtful questions that help them think through problems step by step.

Key principles:
- Be encouraging and patient
- Ask clarifying questions
- Break down complex problems into smaller steps
- Celebrate their reasoning process
- If they're stuck, give gentle hints, not answers
- Use age-appropriate language for a {age}-year-old

When they get something right, acknowledge it warmly. When they struggle, help them find a path forward through questions.

Keep responses conversational and concise - this is voice conversation, not text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_address_learner() {
        let prompt = tutor_instructions("Katie", 11);
        assert!(prompt.contains("talking with Katie, who is 11 years old"));
        assert!(prompt.contains("for a 11-year-old"));
    }
}
