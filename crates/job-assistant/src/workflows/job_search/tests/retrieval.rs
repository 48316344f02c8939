use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::workflows::job_search::dialogue::{RequirementField, Requirements};
use crate::workflows::job_search::retrieval::{
    HybridRetrievalOrchestrator, MatchResult, RetrievalSettings, SearchError,
};
use crate::workflows::job_search::salary::MatchType;

fn requirements(salary: &str) -> Requirements {
    let mut requirements = Requirements::default();
    requirements.set(RequirementField::JobType, "Python开发工程师");
    requirements.set(RequirementField::Location, "深圳");
    requirements.set(RequirementField::Salary, salary);
    requirements
}

fn ids(results: &[MatchResult]) -> Vec<&str> {
    results
        .iter()
        .map(|result| result.candidate.id.as_str())
        .collect()
}

#[tokio::test]
async fn single_call_over_fetches_and_keeps_top_k() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let orchestrator = orchestrator(retriever.clone());

    let results = orchestrator
        .search(&requirements("15-20K"), 3)
        .await
        .expect("search succeeds");

    assert_eq!(
        retriever.calls(),
        vec![("Python开发工程师 深圳".to_string(), 9)]
    );
    assert_eq!(ids(&results), vec!["p1", "p8", "p6"]);
    assert!(results.iter().all(|result| result.accepted));
    assert_eq!(results[0].match_type, MatchType::Full);
    assert!((results[2].score - 0.8).abs() < 1e-9);
    assert!(results
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn rejected_candidates_are_dropped_before_truncation() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let orchestrator = orchestrator(retriever);

    let results = orchestrator
        .search(&requirements("15-20K"), 20)
        .await
        .expect("search succeeds");

    assert_eq!(
        ids(&results),
        vec!["p1", "p8", "p10", "p6", "p4", "p2", "p5", "p9"]
    );
    assert!(!ids(&results).contains(&"p3"));
    assert!(!ids(&results).contains(&"p7"));
    assert_eq!(results.last().map(|r| r.match_type), Some(MatchType::Slight));
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let orchestrator = orchestrator(retriever.clone());
    let requirements = requirements("15-20K");

    let first = orchestrator.search(&requirements, 3).await.expect("first");
    let second = orchestrator.search(&requirements, 3).await.expect("second");

    assert_eq!(first, second);
    assert_eq!(retriever.calls().len(), 2);
}

#[tokio::test]
async fn negotiable_expectation_prefers_negotiable_postings() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let orchestrator = orchestrator(retriever);

    let results = orchestrator
        .search(&requirements("面议"), 3)
        .await
        .expect("search succeeds");

    assert_eq!(ids(&results), vec!["p2", "p1", "p3"]);
    assert_eq!(results[0].match_type, MatchType::BothNegotiable);
    assert_eq!(results[1].match_type, MatchType::UserNegotiable);
}

#[tokio::test]
async fn incomplete_requirements_never_reach_the_retriever() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let orchestrator = orchestrator(retriever.clone());

    let mut partial = Requirements::default();
    partial.set(RequirementField::JobType, "Python开发工程师");

    let err = orchestrator.search(&partial, 3).await.unwrap_err();
    assert_eq!(
        err,
        SearchError::IncompleteRequirements {
            missing: vec![RequirementField::Location, RequirementField::Salary],
        }
    );
    assert!(retriever.calls().is_empty());
}

#[tokio::test]
async fn slow_retriever_is_reported_unavailable() {
    let retriever = Arc::new(
        ScriptedRetriever::new(sample_postings()).with_delay(Duration::from_millis(500)),
    );
    let orchestrator = HybridRetrievalOrchestrator::new(
        retriever.clone(),
        RetrievalSettings {
            timeout: Duration::from_millis(20),
            ..RetrievalSettings::default()
        },
    );

    let err = orchestrator
        .search(&requirements("15-20K"), 3)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SearchError::RetrievalUnavailable {
            reason: "semantic retriever timed out".to_string(),
        }
    );
    assert_eq!(retriever.calls().len(), 1);
}

#[tokio::test]
async fn backend_failures_are_reported_unavailable() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    retriever.set_failing(true);
    let orchestrator = orchestrator(retriever);

    let err = orchestrator
        .search(&requirements("15-20K"), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::RetrievalUnavailable { .. }));
}

#[tokio::test]
async fn empty_results_are_a_valid_outcome() {
    let retriever = Arc::new(ScriptedRetriever::new(vec![posting(
        "far",
        "Python开发",
        "北辰资本",
        "80-100K",
    )]));
    let orchestrator = orchestrator(retriever);

    let results = orchestrator
        .search(&requirements("15-20K"), 3)
        .await
        .expect("no match is not an error");
    assert!(results.is_empty());
}

#[tokio::test]
async fn custom_multiplier_changes_the_request_size() {
    let retriever = Arc::new(ScriptedRetriever::new(sample_postings()));
    let orchestrator = orchestrator(retriever.clone());

    orchestrator
        .search_with(&requirements("15-20K"), 2, 5)
        .await
        .expect("search succeeds");
    assert_eq!(retriever.calls()[0].1, 10);
}
