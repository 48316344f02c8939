use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::job_search::dialogue::ConversationState;
use crate::workflows::job_search::retrieval::MatchView;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One conversation: its dialogue state plus the most recent search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub state: ConversationState,
    pub last_matches: Vec<MatchView>,
    pub started_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: ConversationState::new(),
            last_matches: Vec::new(),
            started_at: Utc::now(),
        }
    }
}

/// Session storage so the assistant can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, SessionRepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionRepositoryError>;
    fn update(&self, record: SessionRecord) -> Result<(), SessionRepositoryError>;
    fn remove(&self, id: &SessionId) -> Result<(), SessionRepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionRepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
