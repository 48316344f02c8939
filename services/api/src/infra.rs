use job_assistant::config::AppConfig;
use job_assistant::error::AppError;
use job_assistant::workflows::job_search::{
    HybridRetrievalOrchestrator, JobSearchAssistant, PostingCatalog, SessionId, SessionRecord,
    SessionRepository, SessionRepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Built-in catalogue used when no postings file is configured.
pub(crate) const SAMPLE_POSTINGS_CSV: &str = include_str!("../data/sample_postings.csv");

pub(crate) type ApiAssistant = JobSearchAssistant<InMemorySessionRepository, PostingCatalog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, SessionRepositoryError> {
        let mut guard = self.records.lock().expect("session mutex poisoned");
        if guard.contains_key(&record.session_id) {
            return Err(SessionRepositoryError::Conflict);
        }
        guard.insert(record.session_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionRepositoryError> {
        let guard = self.records.lock().expect("session mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, record: SessionRecord) -> Result<(), SessionRepositoryError> {
        let mut guard = self.records.lock().expect("session mutex poisoned");
        if guard.contains_key(&record.session_id) {
            guard.insert(record.session_id.clone(), record);
            Ok(())
        } else {
            Err(SessionRepositoryError::NotFound)
        }
    }

    fn remove(&self, id: &SessionId) -> Result<(), SessionRepositoryError> {
        let mut guard = self.records.lock().expect("session mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(SessionRepositoryError::NotFound)
    }
}

impl InMemorySessionRepository {
    pub(crate) fn len(&self) -> usize {
        self.records.lock().expect("session mutex poisoned").len()
    }
}

pub(crate) fn load_catalog(path: Option<&Path>) -> Result<Arc<PostingCatalog>, AppError> {
    let catalog = match path {
        Some(path) => PostingCatalog::from_path(path)?,
        None => PostingCatalog::from_reader(Cursor::new(SAMPLE_POSTINGS_CSV))?,
    };
    info!(
        postings = catalog.len(),
        source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".to_string()),
        "posting catalogue ready"
    );
    Ok(Arc::new(catalog))
}

/// Wire the assistant from configuration: catalogue, understanding provider and tuning.
pub(crate) fn build_assistant(
    config: &AppConfig,
    sessions: Arc<InMemorySessionRepository>,
) -> Result<ApiAssistant, AppError> {
    let catalog = load_catalog(config.assistant.postings_csv.as_deref())?;
    let understanding = config
        .understanding
        .provider(config.assistant.salary_parser())?;
    info!(provider = understanding.name(), "text understanding ready");

    let orchestrator =
        HybridRetrievalOrchestrator::new(catalog, config.assistant.retrieval_settings());
    Ok(JobSearchAssistant::new(
        sessions,
        understanding,
        orchestrator,
        config.assistant.assistant_settings(),
    ))
}
