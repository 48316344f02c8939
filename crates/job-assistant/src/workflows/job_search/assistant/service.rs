use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::prompts;
use super::repository::{SessionId, SessionRecord, SessionRepository, SessionRepositoryError};
use crate::workflows::job_search::dialogue::{
    ConversationState, ProgressSummary, RequirementField, Role, Stage,
};
use crate::workflows::job_search::retrieval::{
    HybridRetrievalOrchestrator, MatchView, SearchError, SemanticRetriever, DEFAULT_RESULT_LIMIT,
};
use crate::workflows::job_search::understanding::{
    is_affirmation, is_negation, Decision, TextUnderstandingProvider, Understanding,
    DEFAULT_HISTORY_WINDOW,
};

pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

const RESTART_COMMANDS: [&str; 3] = ["重新开始", "restart", "/reset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantSettings {
    /// `k` for searches fired by the dialogue.
    pub result_limit: usize,
    /// Failed answers on one stage before the retry prompt lists examples.
    pub max_attempts: u8,
    pub history_window: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            result_limit: DEFAULT_RESULT_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationStart {
    pub session_id: SessionId,
    pub greeting: String,
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub response_text: String,
    pub stage: Stage,
    pub missing_fields: Vec<RequirementField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchView>>,
    pub progress: ProgressSummary,
}

impl TurnOutcome {
    fn new(response_text: String, state: &ConversationState, matches: Option<Vec<MatchView>>) -> Self {
        Self {
            response_text,
            stage: state.stage(),
            missing_fields: state.missing_required_fields(),
            matches,
            progress: state.progress(),
        }
    }
}

/// Conversational front door: slot-filling dialogue that ends in a hybrid job search.
///
/// Turns, resets and closes on one session run one at a time; a session's record is
/// only written by the holder of its lock.
pub struct JobSearchAssistant<S, R: ?Sized> {
    sessions: Arc<S>,
    understanding: Arc<dyn TextUnderstandingProvider>,
    orchestrator: HybridRetrievalOrchestrator<R>,
    settings: AssistantSettings,
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

impl<S, R> JobSearchAssistant<S, R>
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    pub fn new(
        sessions: Arc<S>,
        understanding: Arc<dyn TextUnderstandingProvider>,
        orchestrator: HybridRetrievalOrchestrator<R>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            sessions,
            understanding,
            orchestrator,
            settings,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open a session, log the greeting and move to the first collecting stage.
    pub fn start_conversation(&self) -> Result<ConversationStart, AssistantError> {
        let mut record = SessionRecord::new(next_session_id());
        record.state.record_turn(Role::Assistant, prompts::GREETING);
        let stage = record.state.advance_to_next_stage();

        let stored = self.sessions.insert(record)?;
        info!(session = %stored.session_id, "conversation started");

        Ok(ConversationStart {
            session_id: stored.session_id,
            greeting: prompts::GREETING.to_string(),
            stage,
        })
    }

    pub async fn process_turn(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<TurnOutcome, AssistantError> {
        let _turn = self.lock_session(session_id).await;
        let mut record = self.load_locked(session_id).await?;
        let text = text.trim();

        if text.is_empty() {
            return Ok(TurnOutcome::new(
                prompts::EMPTY_INPUT.to_string(),
                &record.state,
                None,
            ));
        }

        if RESTART_COMMANDS.contains(&text.to_lowercase().as_str()) {
            let start = self.restart(&mut record)?;
            return Ok(TurnOutcome::new(start.greeting, &record.state, None));
        }

        record.state.record_turn(Role::User, text);

        let (response_text, matches) = match record.state.stage() {
            Stage::Greeting => {
                record.state.advance_to_next_stage();
                self.continue_dialogue(&mut record, text).await
            }
            Stage::CollectingJobType | Stage::CollectingLocation | Stage::CollectingSalary => {
                self.continue_dialogue(&mut record, text).await
            }
            Stage::Searching => self.search(&mut record).await,
            Stage::ShowingResults => {
                record.state.advance_to_next_stage();
                (prompts::CLOSING.to_string(), None)
            }
            Stage::Completed => (prompts::COMPLETED_HINT.to_string(), None),
        };

        record.state.record_turn(Role::Assistant, response_text.as_str());
        let outcome = TurnOutcome::new(response_text, &record.state, matches);
        self.sessions.update(record)?;
        Ok(outcome)
    }

    /// Replace the session's state with a fresh conversation in one write. Waits for an
    /// in-flight turn on the same session to finish first.
    pub async fn reset_conversation(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationStart, AssistantError> {
        let _turn = self.lock_session(session_id).await;
        let mut record = self.load_locked(session_id).await?;
        self.restart(&mut record)
    }

    pub async fn close_conversation(&self, session_id: &SessionId) -> Result<(), AssistantError> {
        let _turn = self.lock_session(session_id).await;
        self.sessions.remove(session_id).map_err(|err| match err {
            SessionRepositoryError::NotFound => AssistantError::SessionNotFound(session_id.clone()),
            other => AssistantError::Repository(other),
        })?;
        self.session_locks.lock().await.remove(session_id);
        info!(session = %session_id, "conversation closed");
        Ok(())
    }

    pub fn session(&self, session_id: &SessionId) -> Result<SessionRecord, AssistantError> {
        self.load(session_id)
    }

    async fn lock_session(&self, session_id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = self
            .session_locks
            .lock()
            .await
            .entry(session_id.clone())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn load_locked(&self, session_id: &SessionId) -> Result<SessionRecord, AssistantError> {
        let loaded = self.load(session_id);
        if matches!(loaded, Err(AssistantError::SessionNotFound(_))) {
            self.session_locks.lock().await.remove(session_id);
        }
        loaded
    }

    fn load(&self, session_id: &SessionId) -> Result<SessionRecord, AssistantError> {
        self.sessions
            .fetch(session_id)?
            .ok_or_else(|| AssistantError::SessionNotFound(session_id.clone()))
    }

    fn restart(&self, record: &mut SessionRecord) -> Result<ConversationStart, AssistantError> {
        let mut state = ConversationState::new();
        state.record_turn(Role::Assistant, prompts::GREETING);
        let stage = state.advance_to_next_stage();

        record.state = state;
        record.last_matches.clear();
        self.sessions.update(record.clone())?;
        info!(session = %record.session_id, "conversation reset");

        Ok(ConversationStart {
            session_id: record.session_id.clone(),
            greeting: prompts::GREETING.to_string(),
            stage,
        })
    }

    async fn continue_dialogue(
        &self,
        record: &mut SessionRecord,
        text: &str,
    ) -> (String, Option<Vec<MatchView>>) {
        let stage = record.state.stage();
        let Some(field) = stage.collected_field() else {
            return self.search(record).await;
        };

        if let Some(pending) = record.state.take_pending() {
            if is_affirmation(text) {
                return self.commit(record, pending.field, pending.value).await;
            }
            if is_negation(text) {
                let response = format!(
                    "{}\n\n{}",
                    prompts::CONFIRMATION_REJECTED,
                    prompts::question(stage)
                );
                return (response, None);
            }
        }

        let recent = record
            .state
            .recent_history(self.settings.history_window)
            .to_vec();
        let understanding = match self.understanding.extract(text, stage, &recent).await {
            Ok(understanding) => understanding,
            Err(err) => {
                warn!(
                    session = %record.session_id,
                    provider = self.understanding.name(),
                    error = %err,
                    "text understanding failed"
                );
                Understanding::NotUnderstood
            }
        };

        match understanding {
            Understanding::Extracted(extraction) => match extraction.decision() {
                Decision::Commit => self.commit(record, extraction.field, extraction.value).await,
                Decision::Confirm => {
                    let response = prompts::confirmation(extraction.field, &extraction.value);
                    record.state.set_pending(extraction.field, extraction.value);
                    (response, None)
                }
                Decision::Retry => (self.retry_prompt(record, field), None),
            },
            Understanding::NotUnderstood => (self.retry_prompt(record, field), None),
        }
    }

    async fn commit(
        &self,
        record: &mut SessionRecord,
        field: RequirementField,
        value: String,
    ) -> (String, Option<Vec<MatchView>>) {
        let acknowledgement = prompts::acknowledgement(field, &value);
        record.state.update_requirement(field, value);

        match record.state.advance_to_next_stage() {
            Stage::Searching => {
                let collected = prompts::collected(record.state.requirements());
                let (results, matches) = self.search(record).await;
                (
                    format!("{acknowledgement}\n\n{collected}\n\n{results}"),
                    matches,
                )
            }
            next => (
                format!("{acknowledgement}\n\n{}", prompts::question(next)),
                None,
            ),
        }
    }

    /// Run the single retrieval for this transition. The stage moves to
    /// `ShowingResults` only once a result (possibly empty) is in hand.
    async fn search(&self, record: &mut SessionRecord) -> (String, Option<Vec<MatchView>>) {
        match self
            .orchestrator
            .search(record.state.requirements(), self.settings.result_limit)
            .await
        {
            Ok(results) => {
                let views = MatchView::from_results(&results);
                record.state.advance_to_next_stage();
                record.last_matches = views.clone();
                info!(
                    session = %record.session_id,
                    matches = views.len(),
                    "search results delivered"
                );
                (prompts::results(&views), Some(views))
            }
            Err(SearchError::RetrievalUnavailable { reason }) => {
                warn!(session = %record.session_id, %reason, "search deferred");
                (prompts::SEARCH_UNAVAILABLE.to_string(), None)
            }
            Err(SearchError::IncompleteRequirements { missing }) => {
                warn!(session = %record.session_id, ?missing, "search attempted with gaps");
                let prompt = missing
                    .first()
                    .map(|field| prompts::retry(*field, true))
                    .unwrap_or(prompts::EMPTY_INPUT);
                (prompt.to_string(), None)
            }
        }
    }

    fn retry_prompt(&self, record: &mut SessionRecord, field: RequirementField) -> String {
        let attempts = record.state.register_failed_attempt();
        let with_examples = attempts >= self.settings.max_attempts.saturating_sub(1).max(1);
        prompts::retry(field, with_examples).to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("conversation session '{0}' not found")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Repository(#[from] SessionRepositoryError),
}
