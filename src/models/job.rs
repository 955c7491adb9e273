//! Job postings, their skills, and the write models used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::application::ReceivedApplication;
use super::profile::ProfileSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Open,
    Closed,
}

impl JobStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

/// Full job row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub duration_days: Option<i32>,
    pub category: Option<String>,
    pub status: JobStatus,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Title and company attached to a learner's application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub title: String,
    pub company_name: Option<String>,
}

impl JobSummary {
    pub const COLUMNS: &'static [&'static str] = &["title", "company_name"];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
}

impl Skill {
    pub const COLUMNS: &'static [&'static str] = &["id", "name", "category"];
}

/// `job_skills` row with its skill embedded.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSkillRow {
    #[serde(rename = "skills")]
    pub skill: Option<Skill>,
}

/// Job detail page: the job, its skills and whether the viewer applied.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub skills: Vec<Skill>,
    pub has_applied: bool,
}

/// One of an employer's jobs with every application received on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployerJob {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company_name: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub duration_days: Option<i32>,
    pub category: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub applications: Vec<ReceivedApplication>,
}

impl EmployerJob {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "description",
        "company_name",
        "budget_min",
        "budget_max",
        "duration_days",
        "category",
        "status",
        "created_at",
    ];
}

/// Application with the applicant's profile stitched on.
pub type ApplicationWithProfile = crate::services::stitch::Stitched<ReceivedApplication, ProfileSummary>;

/// [`EmployerJob`] after stitching applicant profiles.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmployerJobView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company_name: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub duration_days: Option<i32>,
    pub category: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub applications: Vec<ApplicationWithProfile>,
}

/// Job fields accepted from both the employer form and the admin endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJob {
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    #[validate(range(min = 0, message = "budget_min must be non-negative"))]
    pub budget_min: Option<i64>,
    #[validate(range(min = 0, message = "budget_max must be non-negative"))]
    pub budget_max: Option<i64>,
    #[validate(range(min = 0, message = "duration_days must be non-negative"))]
    pub duration_days: Option<i32>,
    pub category: Option<String>,
    /// Raw skill ids; entries that are not UUIDs are skipped when linking.
    #[serde(default)]
    pub skills: Vec<serde_json::Value>,
}

impl CreateJob {
    /// Trim text fields; blank optional fields become `None`.
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.company_name = blank_to_none(self.company_name);
        self.company_logo = blank_to_none(self.company_logo);
        self.category = blank_to_none(self.category);
        self
    }
}

/// Body of `POST /create-job`: the job fields plus back-office overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminCreateJob {
    #[serde(flatten)]
    pub job: CreateJob,
    pub employer_id: Option<Uuid>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub is_verified: bool,
}

/// Row written to `jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct NewJob {
    pub employer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub duration_days: Option<i32>,
    pub category: Option<String>,
    pub status: JobStatus,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewJobSkill {
    pub job_id: Uuid,
    pub skill_id: Uuid,
}

/// Query parameters of `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilters {
    pub category: Option<String>,
    pub limit: Option<i64>,
}

impl JobFilters {
    const DEFAULT_LIMIT: i64 = 20;
    const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
