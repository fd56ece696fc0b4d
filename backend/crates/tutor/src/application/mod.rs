//! Application Layer
//!
//! Tutor use cases.

pub mod config;
pub mod end_conversation;
pub mod history;
pub mod profile;
pub mod start_conversation;
pub mod voices;

// Re-exports
pub use config::TutorConfig;
pub use end_conversation::{EndConversationInput, EndConversationUseCase};
pub use history::{ConversationPage, ListConversationsUseCase};
pub use profile::{UpdateProfileInput, UpdateProfileUseCase};
pub use start_conversation::{StartConversationOutput, StartConversationUseCase};
pub use voices::{VoiceListing, list_voices};
