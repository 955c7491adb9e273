//! Route definitions for the SkillLink API.

pub mod admin;
pub mod applications;
pub mod courses;
pub mod dashboard;
pub mod employer;
pub mod health;
pub mod jobs;
pub mod learning;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/employer/overview", get(employer::overview))
        .route("/jobs", get(jobs::list).post(jobs::create))
        .route("/jobs/{id}", get(jobs::get_by_id))
        .route("/jobs/{id}/status", patch(jobs::toggle_status))
        .route("/jobs/{id}/applications", post(applications::apply))
        .route(
            "/applications/{id}/status",
            patch(applications::update_status),
        )
        .route("/skills", get(jobs::list_skills))
        .route("/learning-paths", get(learning::list))
        .route("/learning-paths/{id}", get(learning::get_by_id))
        .route(
            "/learning-paths/{id}/likes",
            get(courses::likes).post(courses::toggle_like),
        )
        .route(
            "/learning-paths/{id}/reviews",
            get(courses::reviews).put(courses::submit_review),
        )
        .route("/lessons/{id}", get(learning::get_lesson))
        .route("/lessons/{id}/complete", post(learning::complete_lesson));

    let admin_routes = Router::new()
        .route(
            "/create-job",
            post(admin::create_job).options(admin::preflight),
        )
        .route(
            "/create-learning-path",
            post(admin::create_learning_path).options(admin::preflight),
        );

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1", api_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
