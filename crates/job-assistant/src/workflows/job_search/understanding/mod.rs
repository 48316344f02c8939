//! Turning a user reply into a candidate requirement value.
//!
//! Providers are polymorphic over [`TextUnderstandingProvider`]. [`KeywordHeuristics`] is
//! always available; [`RemoteUnderstanding`] calls a chat-completions endpoint and is
//! normally wrapped in [`WithFallback`] so a failing backend degrades to the heuristics.

mod heuristics;
mod remote;

pub use heuristics::KeywordHeuristics;
pub use remote::{RemoteSettings, RemoteUnderstanding};

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::dialogue::{RequirementField, Stage, Turn};

/// Values at or above this confidence are committed without asking.
pub const COMMIT_CONFIDENCE: f32 = 0.5;

/// Values at or above this confidence (and below [`COMMIT_CONFIDENCE`]) are confirmed first.
pub const CONFIRM_CONFIDENCE: f32 = 0.3;

/// Number of prior turns handed to providers as context.
pub const DEFAULT_HISTORY_WINDOW: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub field: RequirementField,
    pub value: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Understanding {
    Extracted(Extraction),
    NotUnderstood,
}

/// What the turn loop should do with an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Commit,
    Confirm,
    Retry,
}

impl Extraction {
    pub fn decision(&self) -> Decision {
        if self.value.trim().is_empty() {
            Decision::Retry
        } else if self.confidence >= COMMIT_CONFIDENCE {
            Decision::Commit
        } else if self.confidence >= CONFIRM_CONFIDENCE {
            Decision::Confirm
        } else {
            Decision::Retry
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UnderstandingError {
    #[error("understanding backend unreachable: {0}")]
    Transport(String),
    #[error("understanding backend returned an unusable reply: {0}")]
    MalformedReply(String),
    #[error("understanding backend is not configured")]
    Disabled,
}

#[async_trait]
pub trait TextUnderstandingProvider: Send + Sync {
    /// Extract a value for the field collected in `stage`. Non-collecting stages always
    /// yield [`Understanding::NotUnderstood`].
    async fn extract(
        &self,
        text: &str,
        stage: Stage,
        recent: &[Turn],
    ) -> Result<Understanding, UnderstandingError>;

    fn name(&self) -> &'static str;
}

/// Uses `primary` and falls back to [`KeywordHeuristics`] when it errors.
pub struct WithFallback<P> {
    primary: P,
    fallback: KeywordHeuristics,
}

impl<P> WithFallback<P>
where
    P: TextUnderstandingProvider,
{
    pub fn new(primary: P, fallback: KeywordHeuristics) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P> TextUnderstandingProvider for WithFallback<P>
where
    P: TextUnderstandingProvider,
{
    async fn extract(
        &self,
        text: &str,
        stage: Stage,
        recent: &[Turn],
    ) -> Result<Understanding, UnderstandingError> {
        match self.primary.extract(text, stage, recent).await {
            Ok(understanding) => Ok(understanding),
            Err(err) => {
                warn!(
                    provider = self.primary.name(),
                    error = %err,
                    "understanding provider failed; using keyword heuristics"
                );
                Ok(self.fallback.understand(text, stage))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

/// Affirmative replies to a confirmation question.
pub fn is_affirmation(text: &str) -> bool {
    const AFFIRMATIONS: [&str; 11] = [
        "是", "是的", "对", "对的", "没错", "好的", "嗯", "yes", "y", "ok", "correct",
    ];
    AFFIRMATIONS.contains(&confirmation_token(text).as_str())
}

/// Negative replies to a confirmation question.
pub fn is_negation(text: &str) -> bool {
    const NEGATIONS: [&str; 7] = ["不是", "不对", "错了", "不", "no", "n", "wrong"];
    NEGATIONS.contains(&confirmation_token(text).as_str())
}

fn confirmation_token(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || "，。！？～、".contains(c))
        .trim()
        .to_lowercase()
}
