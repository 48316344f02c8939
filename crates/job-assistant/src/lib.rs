//! Conversational job-search assistant: collects job type, location and salary
//! expectations over a short dialogue, then runs a semantic search filtered and ranked by
//! salary compatibility.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

pub use config::AppConfig;
pub use error::AppError;
