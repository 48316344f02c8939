use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::assistant::{
    AssistantError, JobSearchAssistant, SessionId, SessionRecord, SessionRepository,
};
use super::dialogue::{ProgressSummary, Requirements, Stage, Turn};
use super::retrieval::{MatchView, SemanticRetriever};

/// Router builder exposing the conversation endpoints.
pub fn assistant_router<S, R>(assistant: Arc<JobSearchAssistant<S, R>>) -> Router
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/conversations", post(start_handler::<S, R>))
        .route(
            "/api/v1/conversations/:session_id",
            delete(close_handler::<S, R>).get(session_handler::<S, R>),
        )
        .route(
            "/api/v1/conversations/:session_id/turns",
            post(turn_handler::<S, R>),
        )
        .route(
            "/api/v1/conversations/:session_id/reset",
            post(reset_handler::<S, R>),
        )
        .with_state(assistant)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

/// Snapshot of a session for front ends that reconnect.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub stage: Stage,
    pub requirements: Requirements,
    pub progress: ProgressSummary,
    pub history: Vec<Turn>,
    pub last_matches: Vec<MatchView>,
}

impl From<SessionRecord> for SessionView {
    fn from(record: SessionRecord) -> Self {
        Self {
            stage: record.state.stage(),
            requirements: record.state.requirements().clone(),
            progress: record.state.progress(),
            history: record.state.history().to_vec(),
            session_id: record.session_id,
            last_matches: record.last_matches,
        }
    }
}

pub(crate) async fn start_handler<S, R>(
    State(assistant): State<Arc<JobSearchAssistant<S, R>>>,
) -> Response
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    match assistant.start_conversation() {
        Ok(start) => (StatusCode::CREATED, axum::Json(start)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn turn_handler<S, R>(
    State(assistant): State<Arc<JobSearchAssistant<S, R>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<TurnRequest>,
) -> Response
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    let session_id = SessionId(session_id);
    match assistant.process_turn(&session_id, &request.text).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reset_handler<S, R>(
    State(assistant): State<Arc<JobSearchAssistant<S, R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    match assistant.reset_conversation(&SessionId(session_id)).await {
        Ok(start) => (StatusCode::OK, axum::Json(start)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<S, R>(
    State(assistant): State<Arc<JobSearchAssistant<S, R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    match assistant.session(&SessionId(session_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(SessionView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn close_handler<S, R>(
    State(assistant): State<Arc<JobSearchAssistant<S, R>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionRepository + 'static,
    R: SemanticRetriever + ?Sized + 'static,
{
    match assistant.close_conversation(&SessionId(session_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: AssistantError) -> Response {
    let status = match &err {
        AssistantError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        AssistantError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
