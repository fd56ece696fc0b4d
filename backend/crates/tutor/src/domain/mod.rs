//! Domain Layer
//!
//! Voice catalog, conversation entity, and the ports for persistence and
//! the realtime voice session provider.

pub mod conversation;
pub mod realtime;
pub mod repository;
pub mod voice;

pub use conversation::{Conversation, ConversationSummary};
pub use realtime::RealtimeSessionProvider;
pub use repository::ConversationRepository;
