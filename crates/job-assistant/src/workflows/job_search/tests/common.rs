use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::job_search::assistant::{
    AssistantSettings, JobSearchAssistant, SessionId, SessionRecord, SessionRepository,
    SessionRepositoryError,
};
use crate::workflows::job_search::dialogue::{Stage, Turn};
use crate::workflows::job_search::retrieval::{
    CandidatePosting, HybridRetrievalOrchestrator, RetrievalSettings, RetrieverError,
    SemanticRetriever,
};
use crate::workflows::job_search::understanding::{
    Extraction, KeywordHeuristics, TextUnderstandingProvider, Understanding, UnderstandingError,
};

pub(super) fn posting(id: &str, title: &str, company: &str, salary: &str) -> CandidatePosting {
    CandidatePosting {
        id: id.to_string(),
        raw_salary_text: salary.to_string(),
        metadata: BTreeMap::from([
            ("job_title".to_string(), title.to_string()),
            ("company_name".to_string(), company.to_string()),
            ("location".to_string(), "深圳".to_string()),
        ]),
    }
}

/// Ten postings in semantic order. Against an expectation of 15-20K the accepted
/// ranking is p1, p8 (both full, tie kept in order), then p6.
pub(super) fn sample_postings() -> Vec<CandidatePosting> {
    vec![
        posting("p1", "Python开发工程师", "星云科技", "15-25K"),
        posting("p2", "Python后端开发", "蓝鲸互联", "面议"),
        posting("p3", "Python实习生", "青禾教育", "5-8K"),
        posting("p4", "高级Python工程师", "远山数据", "18-30K"),
        posting("p5", "初级Python开发", "小满网络", "12-14K"),
        posting("p6", "Python数据工程师", "极光智能", "16-22K"),
        posting("p7", "Python技术总监", "北辰资本", "50-60K"),
        posting("p8", "Python服务端开发", "星云科技", "15-20K"),
        posting("p9", "资深Python架构师", "云帆科技", "20K以上"),
        posting("p10", "Python开发工程师", "晨曦软件", "15-20K"),
    ]
}

pub(super) struct ScriptedRetriever {
    postings: Vec<CandidatePosting>,
    calls: Mutex<Vec<(String, usize)>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl ScriptedRetriever {
    pub(super) fn new(postings: Vec<CandidatePosting>) -> Self {
        Self {
            postings,
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    pub(super) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(super) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(super) fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl SemanticRetriever for ScriptedRetriever {
    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CandidatePosting>, RetrieverError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((query.to_string(), limit));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RetrieverError::Backend("index offline".to_string()));
        }
        Ok(self.postings.iter().take(limit).cloned().collect())
    }
}

/// Echoes the input back as the value for the current stage at a fixed confidence.
pub(super) struct FixedUnderstanding(pub(super) f32);

#[async_trait]
impl TextUnderstandingProvider for FixedUnderstanding {
    async fn extract(
        &self,
        text: &str,
        stage: Stage,
        _recent: &[Turn],
    ) -> Result<Understanding, UnderstandingError> {
        Ok(match stage.collected_field() {
            Some(field) => Understanding::Extracted(Extraction {
                field,
                value: text.trim().to_string(),
                confidence: self.0,
            }),
            None => Understanding::NotUnderstood,
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

pub(super) struct BrokenUnderstanding;

#[async_trait]
impl TextUnderstandingProvider for BrokenUnderstanding {
    async fn extract(
        &self,
        _text: &str,
        _stage: Stage,
        _recent: &[Turn],
    ) -> Result<Understanding, UnderstandingError> {
        Err(UnderstandingError::Transport("connection reset".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

pub(super) type TestAssistant = JobSearchAssistant<MemorySessions, ScriptedRetriever>;

pub(super) fn orchestrator(
    retriever: Arc<ScriptedRetriever>,
) -> HybridRetrievalOrchestrator<ScriptedRetriever> {
    HybridRetrievalOrchestrator::new(retriever, RetrievalSettings::default())
}

pub(super) fn build_assistant_with(
    retriever: Arc<ScriptedRetriever>,
    understanding: Arc<dyn TextUnderstandingProvider>,
) -> (TestAssistant, Arc<MemorySessions>) {
    let sessions = Arc::new(MemorySessions::default());
    let assistant = JobSearchAssistant::new(
        sessions.clone(),
        understanding,
        orchestrator(retriever),
        AssistantSettings::default(),
    );
    (assistant, sessions)
}

pub(super) fn build_assistant() -> (TestAssistant, Arc<MemorySessions>, Arc<ScriptedRetriever>) {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let (assistant, sessions) =
        build_assistant_with(retriever.clone(), Arc::new(KeywordHeuristics::default()));
    (assistant, sessions, retriever)
}

#[derive(Default, Clone)]
pub(super) struct MemorySessions {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl MemorySessions {
    pub(super) fn get(&self, id: &SessionId) -> SessionRecord {
        self.records
            .lock()
            .expect("session mutex poisoned")
            .get(id)
            .cloned()
            .expect("session stored")
    }
}

impl SessionRepository for MemorySessions {
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
        guard.insert(record.session_id.clone(), record);
        Ok(())
    }

    fn remove(&self, id: &SessionId) -> Result<(), SessionRepositoryError> {
        let mut guard = self.records.lock().expect("session mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(SessionRepositoryError::NotFound)
    }
}

pub(super) struct UnavailableSessions;

impl SessionRepository for UnavailableSessions {
    fn insert(&self, _record: SessionRecord) -> Result<SessionRecord, SessionRepositoryError> {
        Err(SessionRepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SessionRecord>, SessionRepositoryError> {
        Err(SessionRepositoryError::Unavailable("store offline".to_string()))
    }

    fn update(&self, _record: SessionRecord) -> Result<(), SessionRepositoryError> {
        Err(SessionRepositoryError::Unavailable("store offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<(), SessionRepositoryError> {
        Err(SessionRepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
