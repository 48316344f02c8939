use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{
    MatchResult, RetrieverError, SearchError, SemanticRetriever, DEFAULT_CANDIDATE_MULTIPLIER,
    DEFAULT_RETRIEVAL_TIMEOUT,
};
use crate::workflows::job_search::dialogue::{RequirementField, Requirements};
use crate::workflows::job_search::salary::{SalaryParser, SalaryScorer, DEFAULT_TOLERANCE_RATIO};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    pub tolerance_ratio: f64,
    pub candidate_multiplier: usize,
    pub timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            tolerance_ratio: DEFAULT_TOLERANCE_RATIO,
            candidate_multiplier: DEFAULT_CANDIDATE_MULTIPLIER,
            timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }
}

/// Semantic over-fetch followed by salary filtering and score ordering.
pub struct HybridRetrievalOrchestrator<R: ?Sized> {
    retriever: Arc<R>,
    parser: SalaryParser,
    scorer: SalaryScorer,
    settings: RetrievalSettings,
}

impl<R: ?Sized> Clone for HybridRetrievalOrchestrator<R> {
    fn clone(&self) -> Self {
        Self {
            retriever: Arc::clone(&self.retriever),
            parser: self.parser,
            scorer: self.scorer,
            settings: self.settings,
        }
    }
}

impl<R> HybridRetrievalOrchestrator<R>
where
    R: SemanticRetriever + ?Sized,
{
    pub fn new(retriever: Arc<R>, settings: RetrievalSettings) -> Self {
        Self {
            retriever,
            parser: SalaryParser::new(settings.tolerance_ratio),
            scorer: SalaryScorer::new(settings.tolerance_ratio),
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Search with the configured candidate multiplier.
    pub async fn search(
        &self,
        requirements: &Requirements,
        k: usize,
    ) -> Result<Vec<MatchResult>, SearchError> {
        self.search_with(requirements, k, self.settings.candidate_multiplier)
            .await
    }

    /// Issue exactly one retrieval for `k * candidate_multiplier` postings and return at
    /// most `k` accepted matches, best first. An empty list is a valid outcome.
    pub async fn search_with(
        &self,
        requirements: &Requirements,
        k: usize,
        candidate_multiplier: usize,
    ) -> Result<Vec<MatchResult>, SearchError> {
        if !requirements.is_complete() {
            return Err(SearchError::IncompleteRequirements {
                missing: requirements.missing_required_fields(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = semantic_query(requirements);
        let limit = k.saturating_mul(candidate_multiplier.max(1));

        let candidates = match tokio::time::timeout(
            self.settings.timeout,
            self.retriever.retrieve(&query, limit),
        )
        .await
        {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(err)) => return Err(unavailable(&query, err)),
            Err(_) => return Err(unavailable(&query, RetrieverError::Timeout)),
        };

        let expected = self
            .parser
            .parse(
                requirements
                    .get(RequirementField::Salary)
                    .unwrap_or_default(),
            )
            .band();

        let fetched = candidates.len();
        let mut matches: Vec<MatchResult> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let actual = self.parser.parse(&candidate.raw_salary_text).band();
                let verdict = self.scorer.score(expected, actual);
                verdict.accepted.then(|| MatchResult {
                    candidate,
                    score: verdict.score,
                    match_type: verdict.match_type,
                    accepted: true,
                })
            })
            .collect();

        // Stable: equal scores keep the retriever's order.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);

        info!(
            query = %query,
            requested = limit,
            fetched,
            returned = matches.len(),
            "job search completed"
        );
        Ok(matches)
    }
}

/// Job type and location only; salary digits would skew similarity.
fn semantic_query(requirements: &Requirements) -> String {
    [RequirementField::JobType, RequirementField::Location]
        .into_iter()
        .filter_map(|field| requirements.get(field))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn unavailable(query: &str, err: RetrieverError) -> SearchError {
    warn!(query = %query, error = %err, "semantic retrieval failed");
    SearchError::RetrievalUnavailable {
        reason: err.to_string(),
    }
}
