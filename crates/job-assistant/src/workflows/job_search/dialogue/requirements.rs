use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of requirement slots collected during a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementField {
    JobType,
    Location,
    #[serde(alias = "salary_expression")]
    Salary,
    Experience,
    Education,
    CompanySize,
    Industry,
}

impl RequirementField {
    /// Required slots in collection priority.
    pub const REQUIRED: [RequirementField; 3] = [
        RequirementField::JobType,
        RequirementField::Location,
        RequirementField::Salary,
    ];

    pub const ALL: [RequirementField; 7] = [
        RequirementField::JobType,
        RequirementField::Location,
        RequirementField::Salary,
        RequirementField::Experience,
        RequirementField::Education,
        RequirementField::CompanySize,
        RequirementField::Industry,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            RequirementField::JobType => "job_type",
            RequirementField::Location => "location",
            RequirementField::Salary => "salary",
            RequirementField::Experience => "experience",
            RequirementField::Education => "education",
            RequirementField::CompanySize => "company_size",
            RequirementField::Industry => "industry",
        }
    }

    pub const fn is_required(self) -> bool {
        matches!(
            self,
            RequirementField::JobType | RequirementField::Location | RequirementField::Salary
        )
    }
}

impl fmt::Display for RequirementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raised when a field name outside the closed set is supplied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown requirement field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for RequirementField {
    type Err = UnknownField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "job_type" => Ok(RequirementField::JobType),
            "location" => Ok(RequirementField::Location),
            "salary" | "salary_expression" => Ok(RequirementField::Salary),
            "experience" => Ok(RequirementField::Experience),
            "education" => Ok(RequirementField::Education),
            "company_size" => Ok(RequirementField::CompanySize),
            "industry" => Ok(RequirementField::Industry),
            _ => Err(UnknownField(value.to_string())),
        }
    }
}

/// Job-search requirements gathered from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub salary_expression: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
}

impl Requirements {
    pub fn get(&self, field: RequirementField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Overwrites a field; later writes win.
    pub fn set(&mut self, field: RequirementField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    pub fn is_filled(&self, field: RequirementField) -> bool {
        self.get(field)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Missing required fields in the order job type, location, salary.
    pub fn missing_required_fields(&self) -> Vec<RequirementField> {
        RequirementField::REQUIRED
            .into_iter()
            .filter(|field| !self.is_filled(*field))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        RequirementField::REQUIRED
            .iter()
            .all(|field| self.is_filled(*field))
    }

    fn slot(&self, field: RequirementField) -> &Option<String> {
        match field {
            RequirementField::JobType => &self.job_type,
            RequirementField::Location => &self.location,
            RequirementField::Salary => &self.salary_expression,
            RequirementField::Experience => &self.experience,
            RequirementField::Education => &self.education,
            RequirementField::CompanySize => &self.company_size,
            RequirementField::Industry => &self.industry,
        }
    }

    fn slot_mut(&mut self, field: RequirementField) -> &mut Option<String> {
        match field {
            RequirementField::JobType => &mut self.job_type,
            RequirementField::Location => &mut self.location,
            RequirementField::Salary => &mut self.salary_expression,
            RequirementField::Experience => &mut self.experience,
            RequirementField::Education => &mut self.education,
            RequirementField::CompanySize => &mut self.company_size,
            RequirementField::Industry => &mut self.industry,
        }
    }
}
