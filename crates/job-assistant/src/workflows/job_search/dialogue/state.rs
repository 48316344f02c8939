use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::requirements::{RequirementField, Requirements};

/// Conversation stages. Linear, with skip-ahead over slots that are already filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Greeting,
    CollectingJobType,
    CollectingLocation,
    CollectingSalary,
    Searching,
    ShowingResults,
    Completed,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Stage::Greeting => "greeting",
            Stage::CollectingJobType => "collecting_job_type",
            Stage::CollectingLocation => "collecting_location",
            Stage::CollectingSalary => "collecting_salary",
            Stage::Searching => "searching",
            Stage::ShowingResults => "showing_results",
            Stage::Completed => "completed",
        }
    }

    /// Field collected while in this stage, if it is a collecting stage.
    pub const fn collected_field(self) -> Option<RequirementField> {
        match self {
            Stage::CollectingJobType => Some(RequirementField::JobType),
            Stage::CollectingLocation => Some(RequirementField::Location),
            Stage::CollectingSalary => Some(RequirementField::Salary),
            _ => None,
        }
    }

    fn collecting(field: RequirementField) -> Option<Stage> {
        match field {
            RequirementField::JobType => Some(Stage::CollectingJobType),
            RequirementField::Location => Some(Stage::CollectingLocation),
            RequirementField::Salary => Some(Stage::CollectingSalary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the append-only conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

/// Value extracted with middling confidence, awaiting a yes/no from the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub field: RequirementField,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub stage: Stage,
    pub completed_fields: usize,
    pub total_required_fields: usize,
    pub percentage: f32,
    pub missing_fields: Vec<RequirementField>,
    pub ready_for_search: bool,
}

/// Per-session dialogue state. Owned by exactly one session; never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    requirements: Requirements,
    stage: Stage,
    history: Vec<Turn>,
    attempts: u8,
    pending: Option<PendingConfirmation>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            requirements: Requirements::default(),
            stage: Stage::Greeting,
            history: Vec::new(),
            attempts: 0,
            pending: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Last `count` turns, oldest first.
    pub fn recent_history(&self, count: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub fn record_turn(&mut self, role: Role, text: impl Into<String>) {
        self.history.push(Turn {
            role,
            text: text.into(),
            stage: self.stage,
            at: Utc::now(),
        });
    }

    pub fn update_requirement(&mut self, field: RequirementField, value: impl Into<String>) {
        self.requirements.set(field, value);
    }

    /// Update by field name; unknown names are rejected with `false` and leave the
    /// requirements untouched.
    pub fn update_requirement_by_name(&mut self, name: &str, value: impl Into<String>) -> bool {
        match name.parse::<RequirementField>() {
            Ok(field) => {
                self.requirements.set(field, value);
                true
            }
            Err(err) => {
                debug!(%err, "requirement update rejected");
                false
            }
        }
    }

    pub fn missing_required_fields(&self) -> Vec<RequirementField> {
        self.requirements.missing_required_fields()
    }

    /// Move to the next stage and reset the retry counter.
    ///
    /// Collecting stages jump to the next unfilled required slot (wrapping to earlier
    /// gaps), and reach `Searching` only once every required slot is filled.
    pub fn advance_to_next_stage(&mut self) -> Stage {
        let next = match self.stage {
            Stage::Greeting => self.next_unfilled_after(None),
            Stage::CollectingJobType | Stage::CollectingLocation | Stage::CollectingSalary => {
                self.next_unfilled_after(self.stage.collected_field())
            }
            Stage::Searching => Stage::ShowingResults,
            Stage::ShowingResults | Stage::Completed => Stage::Completed,
        };

        debug!(from = self.stage.label(), to = next.label(), "stage advanced");
        self.stage = next;
        self.attempts = 0;
        next
    }

    fn next_unfilled_after(&self, current: Option<RequirementField>) -> Stage {
        let missing = self.requirements.missing_required_fields();
        let position = current
            .and_then(|field| RequirementField::REQUIRED.iter().position(|f| *f == field))
            .map(|index| index + 1)
            .unwrap_or(0);

        RequirementField::REQUIRED[position..]
            .iter()
            .chain(RequirementField::REQUIRED[..position].iter())
            .find(|field| missing.contains(field))
            .and_then(|field| Stage::collecting(*field))
            .unwrap_or(Stage::Searching)
    }

    /// Count an answer that could not be used for the current stage.
    pub fn register_failed_attempt(&mut self) -> u8 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn set_pending(&mut self, field: RequirementField, value: impl Into<String>) {
        self.pending = Some(PendingConfirmation {
            field,
            value: value.into(),
        });
    }

    pub fn take_pending(&mut self) -> Option<PendingConfirmation> {
        self.pending.take()
    }

    pub fn progress(&self) -> ProgressSummary {
        let missing_fields = self.missing_required_fields();
        let total_required_fields = RequirementField::REQUIRED.len();
        let completed_fields = total_required_fields - missing_fields.len();

        ProgressSummary {
            stage: self.stage,
            completed_fields,
            total_required_fields,
            percentage: completed_fields as f32 / total_required_fields as f32 * 100.0,
            ready_for_search: missing_fields.is_empty(),
            missing_fields,
        }
    }

    /// Discard requirements, history and counters in one step.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
