//! Tutor Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Voice catalog, conversation entity, repository and provider traits
//! - `application/` - Use cases
//! - `infra/` - Postgres repository, OpenAI realtime client, in-memory fakes
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Learner profile (name, tutor voice)
//! - Voice catalog with age-based recommendations
//! - Realtime voice conversations: start, end with points, history
//!
//! Every conversation route sits behind the shared `Authenticator` and a
//! per-client rate limit; starting one is also capped per learner per UTC day.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::TutorConfig;
pub use error::{TutorError, TutorResult};
pub use infra::openai::OpenAiRealtimeClient;
pub use infra::postgres::PgConversationRepository;
pub use presentation::handlers::TutorAppState;
pub use presentation::router::tutor_router;
