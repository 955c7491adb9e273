//! Learning path and lesson routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::learning::{
    LearningPath, LearningPathDetail, LearningPathFilters, LessonDetail, ProgressRecord,
};
use crate::services::auth::Session;
use crate::services::learning as learning_service;
use crate::AppState;

/// GET /api/v1/learning-paths: published paths.
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<LearningPathFilters>,
) -> Result<Json<ApiResponse<Vec<LearningPath>>>, AppError> {
    let paths = learning_service::list_learning_paths(state.gateway.as_ref(), &filters).await?;
    Ok(ApiResponse::success(paths))
}

/// GET /api/v1/learning-paths/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LearningPathDetail>>, AppError> {
    let detail = learning_service::get_learning_path(state.gateway.as_ref(), id, &session).await?;
    Ok(ApiResponse::success(detail))
}

/// GET /api/v1/lessons/{id}
pub async fn get_lesson(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LessonDetail>>, AppError> {
    let lesson = learning_service::get_lesson(state.gateway.as_ref(), id, &session).await?;
    Ok(ApiResponse::success(lesson))
}

/// POST /api/v1/lessons/{id}/complete
pub async fn complete_lesson(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProgressRecord>>, AppError> {
    let progress = learning_service::mark_lesson_complete(state.gateway.as_ref(), user.id, id).await?;
    Ok(ApiResponse::success(progress))
}
