//! Job applications: submitting one and moving it through its status graph.
//!
//! ```text
//! pending --> accepted
//!    \------> rejected
//! ```
//!
//! Only the employer owning the job may decide. The write is conditional on
//! the row still being `pending`, so of two concurrent decisions exactly one
//! lands.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::gateway::{eq, fetch_optional, insert_one, Embed, Gateway, GatewayError, Query, Record};
use crate::models::application::{Application, ApplicationStatus, ApplyToJob, NewApplication};
use crate::models::job::JobStatus;

#[derive(Debug, Serialize)]
pub struct TransitionResult {
    pub application_id: Uuid,
    pub previous_status: ApplicationStatus,
    pub new_status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
struct JobOwner {
    employer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct OwnedApplication {
    id: Uuid,
    status: ApplicationStatus,
    jobs: Option<JobOwner>,
}

#[derive(Debug, Deserialize)]
struct JobState {
    status: JobStatus,
}

pub fn validate_transition(from: ApplicationStatus, to: ApplicationStatus) -> Result<(), AppError> {
    if !from.can_transition_to(to) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot transition application from {from} to {to}"
        )));
    }
    Ok(())
}

/// Apply to an open job as `applicant_id`.
pub async fn apply_to_job(
    gateway: &dyn Gateway,
    applicant_id: Uuid,
    job_id: Uuid,
    input: ApplyToJob,
) -> Result<Application, AppError> {
    let input = ApplyToJob {
        cover_letter: input.cover_letter.trim().to_string(),
        ..input
    };
    input.validate()?;

    let query = Query::table("jobs").select(&["status"]).eq("id", job_id);
    let job: JobState = fetch_optional(gateway, &query)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    if job.status != JobStatus::Open {
        return Err(AppError::Validation(
            "This job is no longer accepting applications".to_string(),
        ));
    }

    let row = NewApplication {
        job_id,
        applicant_id,
        cover_letter: input.cover_letter,
        proposed_budget: input.proposed_budget,
    };
    let application: Application = insert_one(gateway, "applications", &row)
        .await
        .map_err(|e| match e {
            GatewayError::UniqueViolation(_) => {
                AppError::Conflict("You have already applied to this job".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(
        application_id = %application.id,
        %job_id,
        %applicant_id,
        "Application submitted"
    );
    Ok(application)
}

/// Accept or reject an application on one of the employer's own jobs.
pub async fn update_status(
    gateway: &dyn Gateway,
    employer_id: Uuid,
    application_id: Uuid,
    to: ApplicationStatus,
) -> Result<TransitionResult, AppError> {
    let query = Query::table("applications")
        .select(&["id", "status"])
        .eq("id", application_id)
        .embed(Embed::new("jobs", &["employer_id"]));
    let current: OwnedApplication = fetch_optional(gateway, &query)
        .await?
        .filter(|app: &OwnedApplication| {
            app.jobs.as_ref().and_then(|j| j.employer_id) == Some(employer_id)
        })
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

    validate_transition(current.status, to)?;

    let mut patch = Record::new();
    patch.insert("status".to_string(), json!(to));
    patch.insert("updated_at".to_string(), json!(Utc::now()));
    let filters = [
        eq("id", current.id),
        eq("status", ApplicationStatus::Pending),
    ];
    let updated = gateway.update("applications", &filters, patch).await?;
    if updated.is_empty() {
        return Err(AppError::InvalidTransition(
            "Application was already decided".to_string(),
        ));
    }

    tracing::info!(
        %application_id,
        %employer_id,
        from = %current.status,
        to = %to,
        "Application status changed"
    );
    Ok(TransitionResult {
        application_id,
        previous_status: current.status,
        new_status: to,
    })
}
