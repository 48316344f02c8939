//! Conversational job search: salary normalization, slot-filling dialogue, text
//! understanding, hybrid retrieval and the session facade that drives them.

pub mod assistant;
pub mod dialogue;
pub mod retrieval;
pub mod router;
pub mod salary;
pub mod understanding;

#[cfg(test)]
mod tests;

pub use assistant::{
    AssistantError, AssistantSettings, ConversationStart, JobSearchAssistant, SessionId,
    SessionRecord, SessionRepository, SessionRepositoryError, TurnOutcome,
};
pub use dialogue::{
    ConversationState, PendingConfirmation, ProgressSummary, RequirementField, Requirements,
    Role, Stage, Turn, UnknownField,
};
pub use retrieval::{
    CandidatePosting, CatalogError, HybridRetrievalOrchestrator, MatchResult, MatchView,
    PostingCatalog, RetrievalSettings, RetrieverError, SearchError, SearchSummary,
    SemanticRetriever,
};
pub use router::{assistant_router, SessionView, TurnRequest};
pub use salary::{
    MatchType, SalaryBand, SalaryMatch, SalaryParse, SalaryParser, SalaryRange, SalaryScorer,
};
pub use understanding::{
    Extraction, KeywordHeuristics, RemoteSettings, RemoteUnderstanding,
    TextUnderstandingProvider, Understanding, UnderstandingError, WithFallback,
};
