//! Session-level facade tying dialogue, understanding and retrieval together.

pub mod prompts;
mod repository;
mod service;

pub use repository::{SessionId, SessionRecord, SessionRepository, SessionRepositoryError};
pub use service::{
    AssistantError, AssistantSettings, ConversationStart, JobSearchAssistant, TurnOutcome,
    DEFAULT_MAX_ATTEMPTS,
};
