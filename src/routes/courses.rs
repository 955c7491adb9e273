//! Likes and reviews on a learning path.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::course::{CourseReview, LikeSummary, ReviewListing, SubmitReview};
use crate::services::auth::Session;
use crate::services::course as course_service;
use crate::AppState;

/// GET /api/v1/learning-paths/{id}/likes
pub async fn likes(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LikeSummary>>, AppError> {
    let summary = course_service::like_summary(state.gateway.as_ref(), id, &session).await?;
    Ok(ApiResponse::success(summary))
}

/// POST /api/v1/learning-paths/{id}/likes: like or unlike.
pub async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LikeSummary>>, AppError> {
    let summary = course_service::toggle_like(state.gateway.as_ref(), user.id, id).await?;
    Ok(ApiResponse::success(summary))
}

/// GET /api/v1/learning-paths/{id}/reviews
pub async fn reviews(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReviewListing>>, AppError> {
    let listing = course_service::list_reviews(state.gateway.as_ref(), id, &session).await?;
    Ok(ApiResponse::success(listing))
}

/// PUT /api/v1/learning-paths/{id}/reviews: create or replace own review.
pub async fn submit_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitReview>,
) -> Result<Json<ApiResponse<CourseReview>>, AppError> {
    let review = course_service::submit_review(state.gateway.as_ref(), user.id, id, body).await?;
    Ok(ApiResponse::success(review))
}
