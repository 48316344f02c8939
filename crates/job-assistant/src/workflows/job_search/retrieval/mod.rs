//! Two-stage job retrieval: semantic over-fetch, then salary filtering and ranking.

mod catalog;
mod orchestrator;

pub use catalog::{CatalogError, PostingCatalog};
pub use orchestrator::{HybridRetrievalOrchestrator, RetrievalSettings};

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::dialogue::RequirementField;
use super::salary::MatchType;

pub const DEFAULT_CANDIDATE_MULTIPLIER: usize = 3;
pub const DEFAULT_RESULT_LIMIT: usize = 3;
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// A posting returned by the semantic retriever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePosting {
    pub id: String,
    pub raw_salary_text: String,
    pub metadata: BTreeMap<String, String>,
}

impl CandidatePosting {
    pub fn title(&self) -> &str {
        self.metadata_value("job_title")
    }

    pub fn company(&self) -> &str {
        self.metadata_value("company_name")
    }

    pub fn location(&self) -> &str {
        self.metadata_value("location")
    }

    pub fn metadata_value(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrieverError {
    #[error("semantic retriever timed out")]
    Timeout,
    #[error("semantic retriever failed: {0}")]
    Backend(String),
}

/// Shared, read-mostly index. Must return at most `limit` postings ordered by
/// descending similarity, deterministically for a fixed index snapshot.
#[async_trait]
pub trait SemanticRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CandidatePosting>, RetrieverError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("requirements are incomplete; missing {missing:?}")]
    IncompleteRequirements { missing: Vec<RequirementField> },
    #[error("job retrieval is unavailable: {reason}")]
    RetrievalUnavailable { reason: String },
}

/// One accepted, scored candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub candidate: CandidatePosting,
    pub score: f64,
    pub match_type: MatchType,
    pub accepted: bool,
}

/// Rendering-friendly projection of a [`MatchResult`]. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub rank: usize,
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub education: String,
    pub experience: String,
    pub description: String,
    pub score: f64,
    pub match_type: String,
}

impl MatchView {
    pub fn ranked(rank: usize, result: &MatchResult) -> Self {
        let candidate = &result.candidate;
        Self {
            rank,
            id: candidate.id.clone(),
            title: candidate.title().to_string(),
            company: candidate.company().to_string(),
            location: candidate.location().to_string(),
            salary: candidate.raw_salary_text.clone(),
            education: candidate.metadata_value("education").to_string(),
            experience: candidate.metadata_value("experience").to_string(),
            description: candidate.metadata_value("description").to_string(),
            score: result.score,
            match_type: result.match_type.label().to_string(),
        }
    }

    /// Views for an already ordered result list, ranked from 1.
    pub fn from_results(results: &[MatchResult]) -> Vec<Self> {
        results
            .iter()
            .enumerate()
            .map(|(index, result)| Self::ranked(index + 1, result))
            .collect()
    }
}

/// Distinct companies, locations and salary texts across a result list, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSummary {
    pub total: usize,
    pub companies: Vec<String>,
    pub locations: Vec<String>,
    pub salaries: Vec<String>,
}

impl SearchSummary {
    pub fn from_views(views: &[MatchView]) -> Self {
        let mut summary = SearchSummary {
            total: views.len(),
            ..SearchSummary::default()
        };
        for view in views {
            push_distinct(&mut summary.companies, &view.company);
            push_distinct(&mut summary.locations, &view.location);
            push_distinct(&mut summary.salaries, &view.salary);
        }
        summary
    }
}

fn push_distinct(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !values.iter().any(|existing| existing == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(company: &str, location: &str, salary: &str) -> MatchView {
        MatchView {
            rank: 1,
            id: "p".to_string(),
            title: "开发".to_string(),
            company: company.to_string(),
            location: location.to_string(),
            salary: salary.to_string(),
            education: String::new(),
            experience: String::new(),
            description: String::new(),
            score: 1.0,
            match_type: "full".to_string(),
        }
    }

    #[test]
    fn summary_keeps_distinct_values_in_order() {
        let summary = SearchSummary::from_views(&[
            view("字节跳动", "深圳", "15-25K"),
            view("腾讯", "深圳", "20-30K"),
            view("字节跳动", "北京", ""),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.companies, vec!["字节跳动", "腾讯"]);
        assert_eq!(summary.locations, vec!["深圳", "北京"]);
        assert_eq!(summary.salaries, vec!["15-25K", "20-30K"]);
    }

    #[test]
    fn views_carry_rank_and_posting_details() {
        let candidate = |id: &str| CandidatePosting {
            id: id.to_string(),
            raw_salary_text: "15-25K".to_string(),
            metadata: BTreeMap::from([
                ("job_title".to_string(), "Python开发工程师".to_string()),
                ("education".to_string(), "本科".to_string()),
                ("experience".to_string(), "3-5年".to_string()),
                ("description".to_string(), "负责后端服务开发".to_string()),
            ]),
        };
        let results = vec![
            MatchResult {
                candidate: candidate("a"),
                score: 1.0,
                match_type: MatchType::Full,
                accepted: true,
            },
            MatchResult {
                candidate: candidate("b"),
                score: 0.6,
                match_type: MatchType::High,
                accepted: true,
            },
        ];

        let views = MatchView::from_results(&results);
        assert_eq!(
            views.iter().map(|view| (view.rank, view.id.as_str())).collect::<Vec<_>>(),
            vec![(1, "a"), (2, "b")]
        );
        assert_eq!(views[1].education, "本科");
        assert_eq!(views[1].experience, "3-5年");
        assert_eq!(views[1].description, "负责后端服务开发");
        assert_eq!(views[1].match_type, "high");
    }

    #[test]
    fn missing_metadata_reads_as_empty() {
        let candidate = CandidatePosting {
            id: "job-1".to_string(),
            raw_salary_text: "面议".to_string(),
            metadata: BTreeMap::from([("job_title".to_string(), "测试工程师".to_string())]),
        };
        assert_eq!(candidate.title(), "测试工程师");
        assert_eq!(candidate.company(), "");
    }
}
