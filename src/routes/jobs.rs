//! Job board routes: listing, detail, posting and closing jobs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::RequireEmployer;
use crate::models::job::{CreateJob, Job, JobDetail, JobFilters, Skill};
use crate::services::auth::Session;
use crate::services::jobs as job_service;
use crate::AppState;

/// GET /api/v1/jobs: open jobs, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<JobFilters>,
) -> Result<Json<ApiResponse<Vec<Job>>>, AppError> {
    let jobs = job_service::list_jobs(state.gateway.as_ref(), &filters).await?;
    Ok(ApiResponse::success(jobs))
}

/// POST /api/v1/jobs: post a job (employer).
pub async fn create(
    State(state): State<AppState>,
    RequireEmployer(employer): RequireEmployer,
    Json(body): Json<CreateJob>,
) -> Result<(StatusCode, Json<ApiResponse<Job>>), AppError> {
    let job = job_service::post_job(state.gateway.as_ref(), employer.id, body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(job)))
}

/// GET /api/v1/jobs/{id}: job with skills.
pub async fn get_by_id(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobDetail>>, AppError> {
    let job = job_service::get_job(state.gateway.as_ref(), id, &session).await?;
    Ok(ApiResponse::success(job))
}

/// PATCH /api/v1/jobs/{id}/status: open or close an own job (employer).
pub async fn toggle_status(
    State(state): State<AppState>,
    RequireEmployer(employer): RequireEmployer,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Job>>, AppError> {
    let job = job_service::toggle_job_status(state.gateway.as_ref(), employer.id, id).await?;
    Ok(ApiResponse::success(job))
}

/// GET /api/v1/skills: skill catalogue.
pub async fn list_skills(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Skill>>>, AppError> {
    let skills = job_service::list_skills(state.gateway.as_ref()).await?;
    Ok(ApiResponse::success(skills))
}
