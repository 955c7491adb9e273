//! Back-office endpoints guarded by `x-api-key`. Bodies are `{ "error": msg }`
//! on failure instead of the API envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::errors::AdminError;
use crate::middleware::api_key::RequireApiKey;
use crate::models::job::AdminCreateJob;
use crate::models::learning::CreateLearningPath;
use crate::services::admin::{self as admin_service, CreatedJob, CreatedLearningPath};
use crate::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AdminError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AdminError::Validation(rejection.body_text()))
}

/// POST /create-job
pub async fn create_job(
    State(state): State<AppState>,
    _key: RequireApiKey,
    payload: Result<Json<AdminCreateJob>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedJob>), AdminError> {
    let created = admin_service::create_job_from_admin(state.gateway.as_ref(), body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /create-learning-path
pub async fn create_learning_path(
    State(state): State<AppState>,
    _key: RequireApiKey,
    payload: Result<Json<CreateLearningPath>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedLearningPath>), AdminError> {
    let created = admin_service::create_learning_path(state.gateway.as_ref(), body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// OPTIONS on either endpoint: empty 200, CORS headers come from the layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
