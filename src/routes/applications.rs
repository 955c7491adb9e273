//! Application routes: applying to jobs and deciding on applications.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireEmployer;
use crate::models::application::{Application, ApplyToJob, UpdateApplicationStatus};
use crate::services::application::{self as application_service, TransitionResult};
use crate::AppState;

/// POST /api/v1/jobs/{id}/applications: apply to an open job.
pub async fn apply(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(body): Json<ApplyToJob>,
) -> Result<(StatusCode, Json<ApiResponse<Application>>), AppError> {
    let application =
        application_service::apply_to_job(state.gateway.as_ref(), user.id, job_id, body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(application)))
}

/// PATCH /api/v1/applications/{id}/status: accept or reject (owning employer).
pub async fn update_status(
    State(state): State<AppState>,
    RequireEmployer(employer): RequireEmployer,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateApplicationStatus>,
) -> Result<Json<ApiResponse<TransitionResult>>, AppError> {
    let result =
        application_service::update_status(state.gateway.as_ref(), employer.id, id, body.status)
            .await?;
    Ok(ApiResponse::success(result))
}
