//! Slot-filling dialogue state: requirements, stage progression and the turn log.

mod requirements;
mod state;

pub use requirements::{RequirementField, Requirements, UnknownField};
pub use state::{ConversationState, PendingConfirmation, ProgressSummary, Role, Stage, Turn};
