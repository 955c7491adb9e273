//! Job application model and its status state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::job::JobSummary;

/// `pending` is initial; `accepted` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check whether a status transition is an edge of the state machine.
    pub fn can_transition_to(&self, to: ApplicationStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Accepted) | (Self::Pending, Self::Rejected)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full application row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub proposed_budget: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Learner-side view: one of the user's recent applications with its job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub proposed_budget: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(alias = "jobs")]
    pub job: Option<JobSummary>,
}

impl ApplicationSummary {
    pub const COLUMNS: &'static [&'static str] = &["id", "status", "proposed_budget", "created_at"];
}

/// Employer-side view: an application received on one of the employer's jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceivedApplication {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub proposed_budget: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl ReceivedApplication {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "applicant_id",
        "status",
        "cover_letter",
        "proposed_budget",
        "created_at",
    ];
}

/// Body of `POST /api/v1/jobs/{id}/applications`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyToJob {
    #[validate(length(min = 1, max = 5000, message = "cover_letter is required"))]
    pub cover_letter: String,
    #[validate(range(min = 0, message = "proposed_budget must be non-negative"))]
    pub proposed_budget: Option<i64>,
}

/// Row written when a learner applies.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: String,
    pub proposed_budget: Option<i64>,
}

/// Body of `PATCH /api/v1/applications/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateApplicationStatus {
    pub status: ApplicationStatus,
}
