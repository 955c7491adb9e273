//! Dashboard routes: the learner overview page.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::services::auth::Session;
use crate::services::dashboard::{self, DashboardSnapshot};
use crate::AppState;

/// GET /api/v1/dashboard: aggregated snapshot; empty for anonymous callers.
pub async fn get_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<DashboardSnapshot>>, AppError> {
    let snapshot = dashboard::load_dashboard_latest(
        state.gateway.as_ref(),
        &state.dashboards,
        &session,
        &state.config.dashboard_policy,
    )
    .await?;
    Ok(ApiResponse::success(snapshot))
}
